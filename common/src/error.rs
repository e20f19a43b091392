//! Error types of the probe.
//!
//! None of these escape the probe as a fatal fault: transport and signaling
//! errors are folded into an [`crate::outcome::Outcome`], target errors are
//! usage errors caught while parsing the command line.

use thiserror::Error;

use crate::outcome::TransportFailure;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target host is empty")]
    Empty,

    #[error("invalid port in target: {0}")]
    InvalidPort(String),

    #[error("invalid target: {0}")]
    Malformed(String),
}

/// A step of the secure transport setup failed.
#[derive(Debug, Error)]
#[error("{step}: {detail}")]
pub struct TransportError {
    pub step: TransportFailure,
    pub detail: String,
}

impl TransportError {
    pub fn new(step: TransportFailure, detail: impl Into<String>) -> Self {
        Self {
            step,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("malformed RAS message: {0}")]
    Codec(String),

    #[error("connection closed by peer")]
    Closed,
}
