//! # Probe Target Model
//!
//! The gatekeeper to probe, written as:
//! * A host name or address (e.g., `gk.example.com`, `10.0.0.1`, `2001:db8::1`).
//! * A host with a signalling port (e.g., `gk.example.com:1301`, `[2001:db8::1]:1301`).

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::config::DEFAULT_SIGNAL_PORT;
use crate::error::TargetError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl FromStr for Target {
    type Err = TargetError;

    /// Parses `host`, `host:port`, a bare IPv6 address or `[ipv6]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }

        if let Some(rest) = s.strip_prefix('[') {
            return parse_bracketed(s, rest);
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Target::new(ip.to_string(), DEFAULT_SIGNAL_PORT));
        }

        match s.rsplit_once(':') {
            Some((host, port)) => Ok(Target::new(validate_host(host)?, parse_port(port)?)),
            None => Ok(Target::new(validate_host(s)?, DEFAULT_SIGNAL_PORT)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let is_v6: bool = matches!(self.ip(), Some(IpAddr::V6(_)));
        match (self.port == DEFAULT_SIGNAL_PORT, is_v6) {
            (true, _) => write!(f, "{}", self.host),
            (false, true) => write!(f, "[{}]:{}", self.host, self.port),
            (false, false) => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

fn parse_bracketed(original: &str, rest: &str) -> Result<Target, TargetError> {
    let (addr, tail) = rest
        .split_once(']')
        .ok_or_else(|| TargetError::Malformed(original.to_string()))?;
    let ip: IpAddr = addr
        .parse()
        .map_err(|_| TargetError::Malformed(original.to_string()))?;

    let port: u16 = match tail {
        "" => DEFAULT_SIGNAL_PORT,
        _ => match tail.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None => return Err(TargetError::Malformed(original.to_string())),
        },
    };

    Ok(Target::new(ip.to_string(), port))
}

fn validate_host(host: &str) -> Result<&str, TargetError> {
    if host.is_empty() {
        return Err(TargetError::Empty);
    }
    let is_valid: bool = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
    if !is_valid {
        return Err(TargetError::Malformed(host.to_string()));
    }
    Ok(host)
}

fn parse_port(port: &str) -> Result<u16, TargetError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(TargetError::InvalidPort(port.to_string())),
        Ok(port) => Ok(port),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_name_should_use_default_port() {
        let target: Target = "gk.example.com".parse().unwrap();
        assert_eq!(target.host(), "gk.example.com");
        assert_eq!(target.port(), DEFAULT_SIGNAL_PORT);
        assert!(target.ip().is_none());
    }

    #[test]
    fn parse_host_with_port() {
        let target: Target = "10.0.0.1:1301".parse().unwrap();
        assert_eq!(target.host(), "10.0.0.1");
        assert_eq!(target.port(), 1301);
        assert!(target.ip().is_some());
    }

    #[test]
    fn parse_bare_ipv6_should_not_split_on_colons() {
        let target: Target = "2001:db8::1".parse().unwrap();
        assert_eq!(target.host(), "2001:db8::1");
        assert_eq!(target.port(), DEFAULT_SIGNAL_PORT);
    }

    #[test]
    fn parse_bracketed_ipv6_with_port() {
        let target: Target = "[2001:db8::1]:1400".parse().unwrap();
        assert_eq!(target.host(), "2001:db8::1");
        assert_eq!(target.port(), 1400);
        assert_eq!(target.to_string(), "[2001:db8::1]:1400");
    }

    #[test]
    fn parse_should_reject_bad_input() {
        assert_eq!("".parse::<Target>(), Err(TargetError::Empty));
        assert_eq!(
            "gk.example.com:http".parse::<Target>(),
            Err(TargetError::InvalidPort("http".to_string()))
        );
        assert_eq!(
            "gk:0".parse::<Target>(),
            Err(TargetError::InvalidPort("0".to_string()))
        );
        assert!(matches!(
            "gk/example".parse::<Target>(),
            Err(TargetError::Malformed(_))
        ));
        assert!(matches!(
            "[2001:db8::1".parse::<Target>(),
            Err(TargetError::Malformed(_))
        ));
    }

    #[test]
    fn display_should_hide_default_port() {
        let target: Target = "gk.example.com".parse().unwrap();
        assert_eq!(target.to_string(), "gk.example.com");
        let target: Target = "gk.example.com:1720".parse().unwrap();
        assert_eq!(target.to_string(), "gk.example.com:1720");
    }
}
