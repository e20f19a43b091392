//! TPKT framing (RFC 1006) for messages on the signalling channel.

use gkprobe_common::error::SignalingError;
use tokio::io::{AsyncRead, AsyncReadExt};

const TPKT_VERSION: u8 = 3;
const HEADER_LEN: usize = 4;
const MAX_FRAME_LEN: usize = u16::MAX as usize;

pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, SignalingError> {
    let total: usize = payload.len() + HEADER_LEN;
    if payload.is_empty() || total > MAX_FRAME_LEN {
        return Err(SignalingError::Codec(format!(
            "payload of {} bytes does not fit a TPKT frame",
            payload.len()
        )));
    }

    let mut frame: Vec<u8> = Vec::with_capacity(total);
    frame.push(TPKT_VERSION);
    frame.push(0);
    frame.extend_from_slice(&(total as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads one frame and returns its payload.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, SignalingError>
where
    R: AsyncRead + Unpin,
{
    let mut header: [u8; HEADER_LEN] = [0; HEADER_LEN];
    read_exact(reader, &mut header).await?;

    if header[0] != TPKT_VERSION {
        return Err(SignalingError::Codec(format!(
            "unsupported TPKT version {}",
            header[0]
        )));
    }
    let total: usize = u16::from_be_bytes([header[2], header[3]]) as usize;
    if total <= HEADER_LEN {
        return Err(SignalingError::Codec(format!("invalid TPKT length {total}")));
    }

    let mut payload: Vec<u8> = vec![0; total - HEADER_LEN];
    read_exact(reader, &mut payload).await?;
    Ok(payload)
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), SignalingError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(SignalingError::Closed),
        Err(e) => Err(SignalingError::Connect(e)),
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
