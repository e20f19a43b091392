//! The registration handshake with the gatekeeper.
//!
//! A [`Signaling`] provider issues one registration and reports progress
//! through the [`EventSink`] of the running attempt. It may answer
//! immediately through [`RegistrationStatus`] or later through the sink,
//! from whatever task it likes.

use async_trait::async_trait;
use gkprobe_common::error::SignalingError;
use gkprobe_common::network::target::Target;
use gkprobe_common::request::{AliasList, ProbeRequest};
use secrecy::SecretString;

use crate::probe::EventSink;

mod per;
pub mod q931;
pub mod ras;
pub mod tpkt;
pub mod tunnel;

pub use tunnel::TunnelSignaling;

/// How the registration is issued.
#[derive(Debug)]
pub struct RegistrationOptions<'a> {
    pub target: &'a Target,
    pub aliases: &'a AliasList,
    pub password: Option<&'a SecretString>,
    /// H.245 tunnelling. Required when signalling runs over TLS.
    pub h245_tunneling: bool,
    /// H.460.18 traversal.
    pub h46018: bool,
    /// H.460.23 NAT detection.
    pub h46023: bool,
}

impl<'a> RegistrationOptions<'a> {
    /// The most direct handshake: tunnelling on, alternate routing and
    /// feature negotiation off.
    pub fn for_probe(request: &'a ProbeRequest) -> Self {
        Self {
            target: &request.target,
            aliases: &request.aliases,
            password: request.password.as_ref(),
            h245_tunneling: true,
            h46018: false,
            h46023: false,
        }
    }
}

/// Immediate answer of [`Signaling::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// The outcome arrives later through the event sink.
    Pending,
    Registered,
    Failed(String),
}

#[async_trait]
pub trait Signaling<C: Send + Sync>: Send {
    async fn register(
        &mut self,
        context: &C,
        options: &RegistrationOptions<'_>,
        events: EventSink,
    ) -> Result<RegistrationStatus, SignalingError>;

    /// Abandons the session and closes the secure channel.
    async fn close(&mut self);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
