//! # Cipher Policy
//!
//! An explicit allow/deny policy written in the OpenSSL cipher list syntax,
//! applied as a filter over the suites the TLS library offers.
//!
//! The default, [`LEGACY_COMPATIBLE`], removes weak and export-grade suites
//! while still accepting SHA-1 based suites. rustls only implements AEAD
//! suites, none of which are weak, SHA-1 or MD5 based, so with rustls the
//! default keeps every suite and `@SECLEVEL` has nothing to remove. Rules
//! naming real components (`!CHACHA20`, `ECDSA`, `TLSv1.3`) do narrow the
//! offered set.

use std::str::FromStr;

use rustls::SupportedCipherSuite;

pub const LEGACY_COMPATIBLE: &str = "ALL:!LOW:!EXP:!MD5:!RC4:@STRENGTH:@SECLEVEL=1";

/// Names a class of cipher suites, matched against the IANA style suite name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    /// Everything except the NULL ciphers, as in OpenSSL.
    All,
    Null,
    Low,
    Export,
    Md5,
    Rc4,
    Sha1,
    Tls13,
    /// Any other word, matched as a `_` separated name component.
    Component(String),
}

impl Selector {
    fn parse(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "ALL" | "DEFAULT" => Selector::All,
            "NULL" | "ENULL" | "COMPLEMENTOFALL" => Selector::Null,
            "LOW" => Selector::Low,
            "EXP" | "EXPORT" => Selector::Export,
            "MD5" => Selector::Md5,
            "RC4" => Selector::Rc4,
            "SHA1" | "SHA" => Selector::Sha1,
            "TLSV1.3" => Selector::Tls13,
            other => Selector::Component(other.to_string()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Selector::All => !name.contains("NULL"),
            Selector::Null => name.contains("NULL"),
            Selector::Low => strength(name) < 128,
            Selector::Export => name.contains("EXPORT"),
            Selector::Md5 => name.ends_with("_MD5"),
            Selector::Rc4 => name.contains("RC4"),
            Selector::Sha1 => name.ends_with("_SHA"),
            Selector::Tls13 => name.starts_with("TLS13_"),
            Selector::Component(word) => name.split('_').any(|part| part == word),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherPolicy {
    allow: Vec<Selector>,
    deny: Vec<Selector>,
    by_strength: bool,
    security_level: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherPolicyError {
    #[error("cipher policy selects no suites")]
    Empty,

    #[error("invalid security level: {0}")]
    SecurityLevel(String),
}

impl FromStr for CipherPolicy {
    type Err = CipherPolicyError;

    /// Parses `:`, `,` or space separated rules:
    /// * `WORD` or `+WORD` allows a class of suites.
    /// * `!WORD` or `-WORD` denies it, regardless of order.
    /// * `@STRENGTH` orders the result by key strength.
    /// * `@SECLEVEL=n` sets the security level, `n > 1` rejects SHA-1 suites.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut policy: CipherPolicy = CipherPolicy {
            allow: Vec::new(),
            deny: Vec::new(),
            by_strength: false,
            security_level: 1,
        };

        for rule in s.split([':', ',', ' ']).filter(|rule| !rule.is_empty()) {
            if let Some(level) = rule.strip_prefix("@SECLEVEL=") {
                policy.security_level = level
                    .parse()
                    .map_err(|_| CipherPolicyError::SecurityLevel(level.to_string()))?;
            } else if rule == "@STRENGTH" {
                policy.by_strength = true;
            } else if let Some(word) = rule.strip_prefix(['!', '-']) {
                policy.deny.push(Selector::parse(word));
            } else {
                let word: &str = rule.strip_prefix('+').unwrap_or(rule);
                policy.allow.push(Selector::parse(word));
            }
        }

        if policy.allow.is_empty() {
            return Err(CipherPolicyError::Empty);
        }
        Ok(policy)
    }
}

impl Default for CipherPolicy {
    fn default() -> Self {
        LEGACY_COMPATIBLE
            .parse()
            .unwrap_or_else(|_| unreachable!("built-in cipher policy is valid"))
    }
}

impl CipherPolicy {
    pub fn permits(&self, name: &str) -> bool {
        if self.security_level > 1 && Selector::Sha1.matches(name) {
            return false;
        }
        self.allow.iter().any(|selector| selector.matches(name))
            && !self.deny.iter().any(|selector| selector.matches(name))
    }

    /// Applies the policy to suite names, keeping the input order unless
    /// `@STRENGTH` was given.
    #[cfg(test)]
    fn filter_names<'a>(&self, names: &[&'a str]) -> Vec<&'a str> {
        let mut selected: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.permits(name))
            .collect();
        if self.by_strength {
            selected.sort_by_key(|name| std::cmp::Reverse(strength(name)));
        }
        selected
    }

    pub fn select(&self, suites: &[SupportedCipherSuite]) -> Vec<SupportedCipherSuite> {
        let mut selected: Vec<(SupportedCipherSuite, String)> = suites
            .iter()
            .map(|suite| (*suite, suite_name(suite)))
            .filter(|(_, name)| self.permits(name))
            .collect();
        if self.by_strength {
            selected.sort_by_key(|(_, name)| std::cmp::Reverse(strength(name)));
        }
        selected.into_iter().map(|(suite, _)| suite).collect()
    }
}

pub fn suite_name(suite: &SupportedCipherSuite) -> String {
    format!("{:?}", suite.suite())
}

/// Symmetric key strength in bits, derived from the suite name.
fn strength(name: &str) -> u16 {
    if name.contains("NULL") {
        0
    } else if name.contains("EXPORT") {
        40
    } else if name.contains("AES_256") || name.contains("CHACHA20") {
        256
    } else if ["AES_128", "RC4_128", "CAMELLIA_128"].iter().any(|c| name.contains(c)) {
        128
    } else if name.contains("3DES") {
        112
    } else if name.contains("DES") {
        56
    } else {
        128
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
