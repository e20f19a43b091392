//! Turns the verdict into the single monitoring line and the exit code.

use std::process::ExitCode;

use clap::error::ErrorKind;
use gkprobe_common::outcome::{USAGE_EXIT_CODE, Verdict};

pub fn format_verdict(verdict: &Verdict) -> String {
    format!(
        "{} - {} | responseTime={:.3}s",
        verdict.status.label(),
        verdict.reason,
        verdict.response_time
    )
}

pub fn report(verdict: &Verdict) -> ExitCode {
    println!("{}", format_verdict(verdict));
    ExitCode::from(verdict.status.exit_code())
}

/// Help requests print the help text, anything else is reported as UNKNOWN.
pub fn usage(error: &clap::Error) -> ExitCode {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => print!("{error}"),
        _ => {
            println!("UNKNOWN - {}", summary(error));
            print!("{error}");
        }
    }
    ExitCode::from(USAGE_EXIT_CODE)
}

pub fn configuration_error(message: &str) -> ExitCode {
    println!("UNKNOWN - {message}");
    ExitCode::from(USAGE_EXIT_CODE)
}

fn summary(error: &clap::Error) -> String {
    match error.kind() {
        ErrorKind::MissingRequiredArgument => "no host given".to_string(),
        ErrorKind::TooManyValues | ErrorKind::UnknownArgument => "invalid arguments".to_string(),
        kind => kind.as_str().unwrap_or("invalid arguments").to_string(),
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
