//! # Probe Request
//!
//! The immutable input of a probe run. It is resolved once from the command
//! line and then only read.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::{DEFAULT_ALIAS, DEFAULT_LISTEN_PORT, DEFAULT_TIMEOUT, DEFAULT_TLS_LISTEN_PORT};
use crate::network::target::Target;

const ALIAS_SEPARATORS: &[char] = &[' ', ',', ';', '\n'];

/// Local aliases announced to the gatekeeper.
///
/// The first alias is the local identity, the rest are additional aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasList {
    identity: String,
    additional: Vec<String>,
}

impl AliasList {
    /// Splits a user supplied list on spaces, commas, semicolons and newlines.
    ///
    /// Empty tokens are skipped. A list without any token falls back to the
    /// default identity.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = raw
            .split(ALIAS_SEPARATORS)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from);

        match tokens.next() {
            Some(identity) => Self {
                identity,
                additional: tokens.collect(),
            },
            None => Self::default(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn additional(&self) -> &[String] {
        &self.additional
    }

    /// Identity first, then the additional aliases.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identity.as_str()).chain(self.additional.iter().map(String::as_str))
    }
}

impl Default for AliasList {
    fn default() -> Self {
        Self {
            identity: DEFAULT_ALIAS.to_string(),
            additional: Vec::new(),
        }
    }
}

/// References to the TLS material. Nothing is loaded here.
#[derive(Debug, Default)]
pub struct TlsMaterial {
    pub ca_file: Option<PathBuf>,
    pub certificate: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
    pub passphrase: Option<SecretString>,
}

/// Where the advisory listeners are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindSelection {
    pub interface: IpAddr,
    pub listen_port: u16,
    pub tls_listen_port: u16,
}

impl BindSelection {
    pub fn listener_addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.listen_port)
    }

    pub fn tls_listener_addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.tls_listen_port)
    }
}

impl Default for BindSelection {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_LISTEN_PORT,
            tls_listen_port: DEFAULT_TLS_LISTEN_PORT,
        }
    }
}

#[derive(Debug)]
pub struct ProbeRequest {
    pub target: Target,
    pub aliases: AliasList,
    pub password: Option<SecretString>,
    pub tls: TlsMaterial,
    pub bind: BindSelection,
    pub timeout: Duration,
}

impl ProbeRequest {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            aliases: AliasList::default(),
            password: None,
            tls: TlsMaterial::default(),
            bind: BindSelection::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasList) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_password(mut self, password: Option<SecretString>) -> Self {
        self.password = password;
        self
    }

    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_bind(mut self, bind: BindSelection) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
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
