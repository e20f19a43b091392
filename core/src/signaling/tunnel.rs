//! # TLS Tunnel Signaling
//!
//! Registers by carrying RAS over a TLS connection to the gatekeeper's
//! signalling port, each message wrapped in a Q.931 Facility as H.460.17
//! describes and framed in TPKT. The session runs on its own task and
//! reports through the [`EventSink`]; [`Signaling::register`] only validates
//! its input and returns [`RegistrationStatus::Pending`].

use std::net::SocketAddr;

use async_trait::async_trait;
use gkprobe_common::error::SignalingError;
use rustls::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use crate::probe::EventSink;
use crate::signaling::ras::{self, GatekeeperRequest, RasReply};
use crate::signaling::{RegistrationOptions, RegistrationStatus, Signaling, q931, tpkt};

#[derive(Debug, Default)]
pub struct TunnelSignaling {
    session: Option<JoinHandle<()>>,
}

impl TunnelSignaling {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Signaling<TlsConnector> for TunnelSignaling {
    async fn register(
        &mut self,
        context: &TlsConnector,
        options: &RegistrationOptions<'_>,
        events: EventSink,
    ) -> Result<RegistrationStatus, SignalingError> {
        let host: &str = options.target.host();
        let server_name: ServerName = ServerName::try_from(host)
            .map_err(|_| SignalingError::InvalidServerName(host.to_string()))?;

        let request: GatekeeperRequest =
            GatekeeperRequest::new(rand::random_range(1..=u16::MAX), options.aliases.iter())?;

        if !options.h245_tunneling {
            warn!("H.245 tunnelling disabled, the gatekeeper may refuse the TLS channel");
        }
        if options.h46018 || options.h46023 {
            debug!("H.460.18/H.460.23 are not negotiated over the tunnel");
        }
        if options.password.is_some() {
            debug!("Password given but H.235 tokens are not sent over the tunnel");
        }

        if let Some(previous) = self.session.take() {
            previous.abort();
        }

        let session: Session = Session {
            connector: context.clone(),
            server_name,
            host: host.to_string(),
            port: options.target.port(),
            request,
            events,
        };
        self.session = Some(tokio::spawn(session.run()));

        Ok(RegistrationStatus::Pending)
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
            debug!("Signalling session closed");
        }
    }
}

struct Session {
    connector: TlsConnector,
    server_name: ServerName,
    host: String,
    port: u16,
    request: GatekeeperRequest,
    events: EventSink,
}

impl Session {
    async fn run(self) {
        let stream: TcpStream = match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Connection to {}:{} failed: {e}", self.host, self.port);
                self.events
                    .on_registration_failed(SignalingError::Connect(e).to_string());
                return;
            }
        };

        let local: SocketAddr = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.events
                    .on_registration_failed(SignalingError::Connect(e).to_string());
                return;
            }
        };
        debug!("Connected to {}:{} from {local}", self.host, self.port);

        let mut channel = match self.connector.connect(self.server_name, stream).await {
            Ok(channel) => {
                self.events.on_secure_channel(true);
                channel
            }
            Err(e) => {
                warn!("{}", SignalingError::Handshake(e.to_string()));
                self.events.on_secure_channel(false);
                return;
            }
        };

        match exchange(&mut channel, &self.request, local).await {
            Ok(reply) => dispatch(&self.events, reply, self.request.sequence()),
            Err(e) => {
                warn!("Registration with {} failed: {e}", self.host);
                self.events.on_registration_failed(e.to_string());
            }
        }

        if let Err(e) = channel.shutdown().await {
            debug!("TLS shutdown failed: {e}");
        }
    }
}

/// Sends the request and reads until the first terminal reply.
async fn exchange<S>(
    channel: &mut S,
    request: &GatekeeperRequest,
    local: SocketAddr,
) -> Result<RasReply, SignalingError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame: Vec<u8> = tpkt::encode_frame(&q931::wrap_ras(&request.encode(local))?)?;
    channel.write_all(&frame).await?;
    channel.flush().await?;
    debug!("Sent GatekeeperRequest #{}", request.sequence());

    loop {
        let payload: Vec<u8> = tpkt::read_frame(channel).await?;
        let Some(message) = q931::unwrap_ras(&payload)? else {
            debug!("Skipping Q.931 message without tunnelled RAS");
            continue;
        };
        match ras::classify(&message)? {
            RasReply::Other(index) => debug!("Skipping RAS message {index}"),
            reply => return Ok(reply),
        }
    }
}

fn dispatch(events: &EventSink, reply: RasReply, expected: u16) {
    let sequence: u16 = match reply {
        RasReply::GatekeeperConfirm { sequence }
        | RasReply::GatekeeperReject { sequence }
        | RasReply::RegistrationConfirm { sequence }
        | RasReply::RegistrationReject { sequence } => sequence,
        RasReply::Other(_) => return,
    };
    if sequence != expected {
        debug!("Reply carries sequence #{sequence}, sent #{expected}");
    }

    info!("Gatekeeper answered with {reply:?}");
    match reply {
        RasReply::GatekeeperConfirm { .. } => events.on_gatekeeper_confirm(),
        RasReply::GatekeeperReject { .. } => events.on_gatekeeper_reject(),
        RasReply::RegistrationConfirm { .. } => events.on_registered(),
        RasReply::RegistrationReject { .. } => events.on_registration_reject(),
        RasReply::Other(_) => {}
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
