//! The secure transport a registration runs over.
//!
//! [`SecureTransport`] is the seam between the probe and the TLS stack: it
//! loads certificate material, holds the advisory listeners and hands out the
//! context the signaling provider connects with. Every step either succeeds
//! or fails synchronously with the
//! [`gkprobe_common::outcome::TransportFailure`] step that broke.

use std::net::SocketAddr;
use std::path::Path;

use async_trait::async_trait;
use gkprobe_common::error::TransportError;
use secrecy::SecretString;

pub mod cipher;
pub mod tls;

pub use cipher::CipherPolicy;
pub use tls::TlsTransport;

#[async_trait]
pub trait SecureTransport: Send {
    /// Whatever the signaling provider needs to open the secure channel.
    type Context: Send + Sync;

    async fn set_ca_file(&mut self, path: &Path) -> Result<(), TransportError>;

    async fn set_certificate(&mut self, path: &Path) -> Result<(), TransportError>;

    async fn set_private_key(
        &mut self,
        path: &Path,
        passphrase: Option<&SecretString>,
    ) -> Result<(), TransportError>;

    /// Binds the signalling listener. Peers never dial it; the stack only
    /// needs a bound socket.
    async fn start_listener(&mut self, addr: SocketAddr) -> Result<(), TransportError>;

    /// Binds the TLS listener and builds the client context.
    async fn initialise_tls(&mut self, addr: SocketAddr) -> Result<Self::Context, TransportError>;

    /// Releases listeners and TLS state.
    async fn close(&mut self);
}
