//! # RAS Messages
//!
//! The slice of H.225.0 RAS the probe needs: encoding a
//! `GatekeeperRequest` in aligned PER and recognising the gatekeeper's
//! terminal replies by their choice index.

use std::net::{IpAddr, SocketAddr};

use gkprobe_common::error::SignalingError;

use crate::signaling::per::PerWriter;

/// `itu-t(0) recommendation(0) h(8) 2250 version(0) 4`, BER content octets.
const PROTOCOL_IDENTIFIER: [u8; 6] = [0x00, 0x08, 0x91, 0x4A, 0x00, 0x04];

/// Root alternatives of `RasMessage` need five bits.
const RAS_CHOICE_BITS: u8 = 5;
const MAX_ALIAS_UNITS: usize = 256;
const MAX_ALIASES: usize = 127;

const GATEKEEPER_REQUEST: u8 = 0;
const GATEKEEPER_CONFIRM: u8 = 1;
const GATEKEEPER_REJECT: u8 = 2;
const REGISTRATION_CONFIRM: u8 = 4;
const REGISTRATION_REJECT: u8 = 5;

/// `TransportAddress` alternatives.
const IP_ADDRESS: u8 = 0;
const IP6_ADDRESS: u8 = 3;

/// `AliasAddress` alternative for `h323-ID`.
const H323_ID: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasReply {
    GatekeeperConfirm { sequence: u16 },
    GatekeeperReject { sequence: u16 },
    RegistrationConfirm { sequence: u16 },
    RegistrationReject { sequence: u16 },
    /// Any other RAS message, identified by its choice index.
    Other(u8),
}

/// Discovery request announcing the local aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatekeeperRequest {
    sequence: u16,
    aliases: Vec<Vec<u16>>,
}

impl GatekeeperRequest {
    /// `sequence` must be non-zero. Aliases are validated here so encoding
    /// can no longer fail on them.
    pub fn new<'a>(
        sequence: u16,
        aliases: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SignalingError> {
        if sequence == 0 {
            return Err(SignalingError::Codec("sequence number must be non-zero".to_string()));
        }

        let mut encoded: Vec<Vec<u16>> = Vec::new();
        for alias in aliases {
            let units: Vec<u16> = alias.encode_utf16().collect();
            if units.is_empty() || units.len() > MAX_ALIAS_UNITS {
                return Err(SignalingError::Codec(format!(
                    "alias '{alias}' must be 1 to {MAX_ALIAS_UNITS} characters"
                )));
            }
            encoded.push(units);
        }
        if encoded.len() > MAX_ALIASES {
            return Err(SignalingError::Codec(format!(
                "at most {MAX_ALIASES} aliases can be announced"
            )));
        }

        Ok(Self {
            sequence,
            aliases: encoded,
        })
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Encodes the request with `ras_address` as the reply address.
    pub fn encode(&self, ras_address: SocketAddr) -> Vec<u8> {
        let mut w: PerWriter = PerWriter::default();

        // RasMessage CHOICE
        w.write_bit(false);
        w.write_bits(GATEKEEPER_REQUEST as u32, RAS_CHOICE_BITS);

        // GatekeeperRequest: extension, then nonStandardData,
        // gatekeeperIdentifier, callServices and endpointAlias presence.
        w.write_bit(false);
        w.write_bits(0b000, 3);
        w.write_bit(!self.aliases.is_empty());

        w.write_u16(self.sequence - 1);

        w.align();
        w.write_octet(PROTOCOL_IDENTIFIER.len() as u8);
        w.write_octets(&PROTOCOL_IDENTIFIER);

        write_transport_address(&mut w, ras_address);
        write_terminal_endpoint_type(&mut w);

        if !self.aliases.is_empty() {
            w.align();
            w.write_octet(self.aliases.len() as u8);
            for units in &self.aliases {
                w.write_bit(false);
                w.write_bits(H323_ID as u32, 1);
                w.align();
                w.write_octet((units.len() - 1) as u8);
                for unit in units {
                    w.write_u16(*unit);
                }
            }
        }

        w.finish()
    }
}

fn write_transport_address(w: &mut PerWriter, address: SocketAddr) {
    w.write_bit(false);
    match address.ip() {
        IpAddr::V4(ip) => {
            w.write_bits(IP_ADDRESS as u32, 3);
            w.write_octets(&ip.octets());
        }
        IpAddr::V6(ip) => {
            w.write_bits(IP6_ADDRESS as u32, 3);
            w.write_bit(false);
            w.write_octets(&ip.octets());
        }
    }
    w.write_u16(address.port());
}

/// `EndpointType` with only `terminal` present, neither MC nor undefined node.
fn write_terminal_endpoint_type(w: &mut PerWriter) {
    w.write_bit(false);
    w.write_bits(0b000001, 6);
    // TerminalInfo: extension and nonStandardData presence.
    w.write_bit(false);
    w.write_bit(false);
    // mc, undefinedNode
    w.write_bit(false);
    w.write_bit(false);
}

/// Identifies a RAS message by its choice index.
///
/// Extension alternatives and non-terminal replies come back as
/// [`RasReply::Other`].
pub fn classify(payload: &[u8]) -> Result<RasReply, SignalingError> {
    let first: u8 = *payload
        .first()
        .ok_or_else(|| SignalingError::Codec("empty RAS message".to_string()))?;

    if first & 0x80 != 0 {
        return Ok(RasReply::Other(u8::MAX));
    }
    let index: u8 = (first >> 2) & 0x1F;

    let sequence = || -> Result<u16, SignalingError> {
        match payload.get(2..4) {
            Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]]).wrapping_add(1)),
            None => Err(SignalingError::Codec(format!(
                "RAS message {index} truncated before its sequence number"
            ))),
        }
    };

    Ok(match index {
        GATEKEEPER_CONFIRM => RasReply::GatekeeperConfirm { sequence: sequence()? },
        GATEKEEPER_REJECT => RasReply::GatekeeperReject { sequence: sequence()? },
        REGISTRATION_CONFIRM => RasReply::RegistrationConfirm { sequence: sequence()? },
        REGISTRATION_REJECT => RasReply::RegistrationReject { sequence: sequence()? },
        other => RasReply::Other(other),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
