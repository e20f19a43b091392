use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gkprobe_common::config::{DEFAULT_LISTEN_PORT, DEFAULT_TLS_LISTEN_PORT, TraceConfig};
use gkprobe_common::network::interface::default_bind_interface;
use gkprobe_common::network::target::Target;
use gkprobe_common::request::{AliasList, BindSelection, ProbeRequest, TlsMaterial};
use gkprobe_core::transport::CipherPolicy;
use gkprobe_core::transport::cipher::LEGACY_COMPATIBLE;
use secrecy::SecretString;

const MAX_TIMEOUT_SECS: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "check_h323_tls")]
#[command(about = "Checks that an H.323 gatekeeper answers a registration over TLS.")]
pub struct CommandLine {
    /// Gatekeeper to probe, `host` or `host:port` (default port 1300)
    pub host: Target,

    /// Select interface to bind to
    #[arg(short, long, value_name = "IPNUM")]
    pub interface: Option<IpAddr>,

    /// TLS Certificate Authority file
    #[arg(long = "tls-cafile", value_name = "FILE")]
    pub tls_cafile: Option<PathBuf>,

    /// TLS certificate file
    #[arg(long = "tls-cert", value_name = "FILE")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key file
    #[arg(long = "tls-privkey", value_name = "FILE")]
    pub tls_privkey: Option<PathBuf>,

    /// TLS private key passphrase
    #[arg(long = "tls-passphrase", value_name = "PASSPHRASE")]
    pub tls_passphrase: Option<String>,

    /// TLS cipher list in OpenSSL syntax
    #[arg(long = "tls-ciphers", value_name = "LIST", default_value = LEGACY_COMPATIBLE)]
    pub tls_ciphers: CipherPolicy,

    /// TLS listen port
    #[arg(long = "tls-listenport", value_name = "PORT", default_value_t = DEFAULT_TLS_LISTEN_PORT)]
    pub tls_listenport: u16,

    /// Enable trace, use multiple times for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub trace: u8,

    /// File for trace output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Gatekeeper password
    #[arg(short, long, value_name = "PW")]
    pub password: Option<String>,

    /// Listening port
    #[arg(short = 'x', long = "listenport", value_name = "PORT",
          default_value_t = DEFAULT_LISTEN_PORT)]
    pub listenport: u16,

    /// Local aliases separated by space, comma or semicolon, the first one is the identity
    #[arg(short, long, value_name = "ALIASES")]
    pub user: Option<String>,

    /// Seconds to wait for the gatekeeper, at most one day
    #[arg(short = 'T', long, value_name = "SECONDS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: u64,
}

impl CommandLine {
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            verbosity: self.trace,
            output: self.output.clone(),
        }
    }

    pub fn cipher_policy(&self) -> CipherPolicy {
        self.tls_ciphers.clone()
    }

    pub fn into_request(self) -> ProbeRequest {
        let aliases: AliasList = self
            .user
            .as_deref()
            .map(AliasList::parse)
            .unwrap_or_default();

        let tls: TlsMaterial = TlsMaterial {
            ca_file: self.tls_cafile,
            certificate: self.tls_cert,
            private_key: self.tls_privkey,
            passphrase: self.tls_passphrase.map(SecretString::new),
        };

        let bind: BindSelection = BindSelection {
            interface: self.interface.unwrap_or_else(default_bind_interface),
            listen_port: self.listenport,
            tls_listen_port: self.tls_listenport,
        };

        ProbeRequest::new(self.host)
            .with_aliases(aliases)
            .with_password(self.password.map(SecretString::new))
            .with_tls(tls)
            .with_bind(bind)
            .with_timeout(Duration::from_secs(self.timeout))
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
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> Result<CommandLine, clap::Error> {
        CommandLine::try_parse_from(std::iter::once("check_h323_tls").chain(args.iter().copied()))
    }

    #[test]
    fn command_line_should_be_consistent() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn missing_host_should_be_a_usage_error() {
        let err: clap::Error = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn second_host_should_be_a_usage_error() {
        assert!(parse(&["gk1", "gk2"]).is_err());
    }

    #[test]
    fn bad_target_should_be_a_usage_error() {
        let err: clap::Error = parse(&["gk.example.com:0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn defaults_should_match_plugin_conventions() {
        let request: ProbeRequest = parse(&["gk.example.com"]).unwrap().into_request();

        assert_eq!(request.target.port(), 1300);
        assert_eq!(request.bind.listen_port, 61720);
        assert_eq!(request.bind.tls_listen_port, 0);
        assert_eq!(request.timeout, Duration::from_secs(30));
        assert_eq!(request.aliases.identity(), "check_h323_tls");
        assert!(request.password.is_none());
    }

    #[test]
    fn options_should_reach_the_request() {
        let cli: CommandLine = parse(&[
            "-i", "127.0.0.1",
            "--tls-cafile", "ca.pem",
            "--tls-cert", "cert.pem",
            "--tls-privkey", "key.pem",
            "--tls-passphrase", "secret",
            "--tls-listenport", "1301",
            "-ttt",
            "-o", "trace.log",
            "-p", "gkpass",
            "-x", "1720",
            "-u", "probe,1001;1002",
            "-T", "5",
            "gk.example.com:1302",
        ])
        .unwrap();

        let trace: TraceConfig = cli.trace_config();
        assert_eq!(trace.verbosity, 3);
        assert_eq!(trace.output, Some(PathBuf::from("trace.log")));

        let request: ProbeRequest = cli.into_request();
        assert_eq!(request.target.port(), 1302);
        assert_eq!(request.bind.listener_addr().to_string(), "127.0.0.1:1720");
        assert_eq!(request.bind.tls_listen_port, 1301);
        assert_eq!(request.tls.certificate, Some(PathBuf::from("cert.pem")));
        assert_eq!(request.tls.passphrase.as_ref().unwrap().expose_secret(), "secret");
        assert_eq!(request.password.as_ref().unwrap().expose_secret(), "gkpass");
        assert_eq!(request.aliases.additional(), &["1001", "1002"]);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_timeout_should_be_rejected() {
        assert!(parse(&["-T", "0", "gk"]).is_err());
    }

    #[test]
    fn timeout_above_one_day_should_be_rejected() {
        let err: clap::Error = parse(&["-T", "86401", "gk"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let huge: clap::Error = parse(&["-T", "18446744073709551615", "gk"]).unwrap_err();
        assert_eq!(huge.kind(), ErrorKind::ValueValidation);

        let request: ProbeRequest = parse(&["-T", "86400", "gk"]).unwrap().into_request();
        assert_eq!(request.timeout, Duration::from_secs(86_400));
    }

    #[test]
    fn cipher_list_should_default_to_legacy_policy() {
        let cli: CommandLine = parse(&["gk"]).unwrap();
        assert_eq!(cli.cipher_policy(), CipherPolicy::default());
    }

    #[test]
    fn cipher_list_should_be_parsed() {
        let cli: CommandLine = parse(&["--tls-ciphers", "ALL:!CHACHA20", "gk"]).unwrap();
        assert!(!cli.cipher_policy().permits("TLS13_CHACHA20_POLY1305_SHA256"));
        assert!(cli.cipher_policy().permits("TLS13_AES_128_GCM_SHA256"));

        let err: clap::Error = parse(&["--tls-ciphers", "!ALL", "gk"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
