mod commands;
mod report;
mod terminal;

use std::process::ExitCode;

use commands::CommandLine;
use gkprobe_common::outcome::Verdict;
use gkprobe_common::request::ProbeRequest;
use gkprobe_core::probe::RegistrationProbe;
use gkprobe_core::signaling::TunnelSignaling;
use gkprobe_core::transport::TlsTransport;
use terminal::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let commands: CommandLine = match CommandLine::try_parse_args() {
        Ok(commands) => commands,
        Err(e) => return report::usage(&e),
    };

    if let Err(e) = logging::init_logging(&commands.trace_config()) {
        return report::configuration_error(&format!("{e:#}"));
    }

    let transport: TlsTransport = TlsTransport::new(commands.cipher_policy());
    let request: ProbeRequest = commands.into_request();
    let probe = RegistrationProbe::new(transport, TunnelSignaling::new());
    let verdict: Verdict = probe.run(&request).await;

    report::report(&verdict)
}
