//! # Registration Probe
//!
//! Drives one registration attempt from transport setup to a [`Verdict`].
//!
//! The probe owns its providers and a [`ProbeAttempt`]. Providers report
//! back through the attempt's [`EventSink`] from any task; the probe only
//! waits, bounded by the request timeout, then seals the attempt and tears
//! everything down before building the verdict.

use gkprobe_common::error::TransportError;
use gkprobe_common::outcome::{Outcome, Verdict, resolve_verdict};
use gkprobe_common::request::ProbeRequest;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::signaling::{RegistrationOptions, RegistrationStatus, Signaling};
use crate::transport::SecureTransport;

mod attempt;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub use attempt::{EventSink, Phase, ProbeAttempt, Resolution};

pub struct RegistrationProbe<T, S>
where
    T: SecureTransport,
    S: Signaling<T::Context>,
{
    transport: T,
    signaling: S,
    attempt: ProbeAttempt,
}

impl<T, S> RegistrationProbe<T, S>
where
    T: SecureTransport,
    S: Signaling<T::Context>,
{
    pub fn new(transport: T, signaling: S) -> Self {
        Self {
            transport,
            signaling,
            attempt: ProbeAttempt::new(),
        }
    }

    pub fn events(&self) -> EventSink {
        self.attempt.events()
    }

    pub fn phase(&self) -> Phase {
        self.attempt.phase()
    }

    /// Opens the signalling listener, applies the TLS material, then
    /// initialises TLS on its own listener.
    ///
    /// The first failing step resolves the attempt to
    /// [`Outcome::TransportSetupFailed`] and stops the setup.
    pub async fn configure_transport(
        &mut self,
        request: &ProbeRequest,
    ) -> Result<T::Context, TransportError> {
        self.attempt.enter(Phase::TransportConfiguring);

        match self.apply_transport(request).await {
            Ok(context) => {
                self.attempt.enter(Phase::TransportReady);
                debug!("Transport ready");
                Ok(context)
            }
            Err(e) => {
                warn!("Transport setup failed: {e}");
                self.attempt.commit(Outcome::TransportSetupFailed(e.step));
                Err(e)
            }
        }
    }

    async fn apply_transport(
        &mut self,
        request: &ProbeRequest,
    ) -> Result<T::Context, TransportError> {
        self.transport
            .start_listener(request.bind.listener_addr())
            .await?;

        let tls = &request.tls;
        if let Some(path) = &tls.ca_file {
            self.transport.set_ca_file(path).await?;
        }
        if let Some(path) = &tls.certificate {
            self.transport.set_certificate(path).await?;
        }
        if let Some(path) = &tls.private_key {
            self.transport
                .set_private_key(path, tls.passphrase.as_ref())
                .await?;
        }

        self.transport
            .initialise_tls(request.bind.tls_listener_addr())
            .await
    }

    /// Starts the clock and issues the registration.
    ///
    /// An immediate answer from the provider is committed like any other
    /// notification.
    pub async fn begin_attempt(&mut self, request: &ProbeRequest, context: &T::Context) {
        self.attempt.start();
        info!("Registering with {} as {}", request.target, request.aliases.identity());

        let options: RegistrationOptions = RegistrationOptions::for_probe(request);
        let events: EventSink = self.attempt.events();
        match self.signaling.register(context, &options, events.clone()).await {
            Ok(RegistrationStatus::Pending) => debug!("Registration pending"),
            Ok(RegistrationStatus::Registered) => events.on_registered(),
            Ok(RegistrationStatus::Failed(reason)) => events.on_registration_failed(reason),
            Err(e) => {
                warn!("Registration could not be issued: {e}");
                events.on_registration_failed(e.to_string());
            }
        }
    }

    /// Runs the whole attempt and returns its verdict. Never fails.
    pub async fn run(mut self, request: &ProbeRequest) -> Verdict {
        let target: String = request.target.to_string();

        let resolution: Resolution = match self.configure_transport(request).await {
            Ok(context) => {
                let deadline: Instant = deadline_after(request.timeout);
                let issued: bool =
                    tokio::time::timeout_at(deadline, self.begin_attempt(request, &context))
                        .await
                        .is_ok();

                if !(issued && self.attempt.wait_until(deadline).await) {
                    warn!("No answer from {target} within {:?}", request.timeout);
                }
                let resolution: Resolution =
                    self.attempt.seal(Outcome::AttemptTimedOut(request.timeout));
                self.signaling.close().await;
                resolution
            }
            Err(e) => self.attempt.seal(Outcome::TransportSetupFailed(e.step)),
        };
        self.transport.close().await;

        debug!("Final outcome {:?} after {:?}", resolution.outcome, resolution.elapsed);
        resolve_verdict(&resolution.outcome, resolution.elapsed.as_secs_f64(), &target)
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now: Instant = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
