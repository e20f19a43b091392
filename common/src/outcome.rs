//! # Outcomes and Verdicts
//!
//! An [`Outcome`] is the single terminal event of a registration attempt.
//! [`resolve_verdict`] turns it into the [`Verdict`] handed to the reporter.
//!
//! The probe measures reachability and TLS + signalling interop, not
//! authorisation: a gatekeeper that answers with a reject is alive and
//! therefore healthy.

use std::fmt;
use std::time::Duration;

/// The transport setup step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    CaFile,
    Certificate,
    PrivateKey,
    Listener,
    TlsInit,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: &str = match self {
            TransportFailure::CaFile => "Can not load TLS CA file",
            TransportFailure::Certificate => "Can not load TLS certificate",
            TransportFailure::PrivateKey => "Can not load TLS private key",
            TransportFailure::Listener => "Can not open listener",
            TransportFailure::TlsInit => "Can not enable TLS",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SecureChannelFailed,
    GatekeeperConfirmed,
    GatekeeperRejected,
    RegistrationRejected,
    /// The registration primitive reported success without an intermediate confirm.
    Registered,
    /// The registration primitive gave up (connection refused, unexpected reply, ...).
    RegistrationFailed(String),
    TransportSetupFailed(TransportFailure),
    AttemptTimedOut(Duration),
}

impl Outcome {
    pub fn status(&self) -> HealthStatus {
        match self {
            Outcome::GatekeeperConfirmed
            | Outcome::GatekeeperRejected
            | Outcome::RegistrationRejected
            | Outcome::Registered => HealthStatus::Healthy,
            Outcome::SecureChannelFailed
            | Outcome::RegistrationFailed(_)
            | Outcome::TransportSetupFailed(_)
            | Outcome::AttemptTimedOut(_) => HealthStatus::Unhealthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == HealthStatus::Healthy
    }

    fn reason(&self, target: &str) -> String {
        match self {
            Outcome::GatekeeperConfirmed => format!("GatekeeperConfirm from {target}"),
            Outcome::GatekeeperRejected => format!("GatekeeperReject from {target}"),
            Outcome::RegistrationRejected => format!("RegistrationReject from {target}"),
            Outcome::Registered => format!("Registered with {target}"),
            Outcome::SecureChannelFailed => {
                format!("Can not establish secure signalling channel with {target}")
            }
            Outcome::RegistrationFailed(detail) => {
                format!("Could not register with {target}: {detail}")
            }
            Outcome::TransportSetupFailed(step) => step.to_string(),
            Outcome::AttemptTimedOut(after) => format!(
                "Timed out after {}s waiting for {target} to respond",
                after.as_secs_f64()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Monitoring plugin status label.
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "OK",
            HealthStatus::Unhealthy => "CRITICAL",
        }
    }

    /// Monitoring plugin exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Unhealthy => 2,
        }
    }
}

/// Exit code for usage and argument errors, neither healthy nor unhealthy.
pub const USAGE_EXIT_CODE: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: HealthStatus,
    pub reason: String,
    /// Seconds between attempt start and resolution, never negative.
    pub response_time: f64,
}

/// Pure mapping of an outcome and its elapsed time onto a verdict.
///
/// Negative or NaN elapsed values are clamped to `0`.
pub fn resolve_verdict(outcome: &Outcome, elapsed_secs: f64, target: &str) -> Verdict {
    let response_time: f64 = if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        elapsed_secs
    } else {
        0.0
    };

    Verdict {
        status: outcome.status(),
        reason: outcome.reason(target),
        response_time,
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
