use std::path::PathBuf;
use std::time::Duration;

/// Port of the advisory H.323 listener. Peers never dial it, so it is kept
/// away from 1720 to avoid clashing with other H.323 software on the host.
pub const DEFAULT_LISTEN_PORT: u16 = 61720;

/// Port of the advisory TLS listener, `0` lets the OS pick one.
pub const DEFAULT_TLS_LISTEN_PORT: u16 = 0;

/// H.323 signalling over TLS.
pub const DEFAULT_SIGNAL_PORT: u16 = 1300;

pub const DEFAULT_ALIAS: &str = "check_h323_tls";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trace settings taken from the repeatable `--trace` flag.
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    /// Number of times `--trace` was given, `0` disables tracing.
    pub verbosity: u8,
    /// Trace destination. Stderr when absent.
    pub output: Option<PathBuf>,
}

impl TraceConfig {
    pub fn is_enabled(&self) -> bool {
        self.verbosity > 0
    }

    /// Maps the trace count onto a `tracing` filter directive.
    pub fn level_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "off",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
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
    fn trace_level_should_grow_with_verbosity() {
        let levels: Vec<&str> = (0..6)
            .map(|verbosity| TraceConfig { verbosity, output: None }.level_directive())
            .collect();
        assert_eq!(levels, vec!["off", "warn", "info", "debug", "trace", "trace"]);
    }

    #[test]
    fn trace_should_be_disabled_by_default() {
        assert!(!TraceConfig::default().is_enabled());
    }
}
