//! # H.460.17 Facility Wrapping
//!
//! H.460.17 carries RAS inside call signalling: each RAS message travels in
//! a Q.931 `Facility` on call reference 0 whose H.225.0 body is `empty` and
//! whose `genericData` holds feature 17. Parameter 1 of that feature is the
//! raw RAS message.
//!
//! Only this one shape is produced. On the way in, any other Q.931 message
//! or Facility without the feature decodes to `None` so the caller can skip
//! it.

use gkprobe_common::error::SignalingError;

use crate::signaling::per::{PerReader, PerWriter};

const PROTOCOL_DISCRIMINATOR: u8 = 0x08;
const FACILITY: u8 = 0x62;
const FACILITY_IE: u8 = 0x1C;
const USER_USER_IE: u8 = 0x7E;
/// User-user information encoded as X.208/X.209 (the H.225.0 discriminator).
const X208_DISCRIMINATOR: u8 = 0x05;

/// `h323-message-body` extension alternative `empty`.
const EMPTY_BODY: u32 = 1;
/// Extension additions of `H323-UU-PDU`, `genericData` last.
const UU_PDU_ADDITIONS: usize = 9;
const H245_TUNNELING: usize = 1;
const GENERIC_DATA: usize = 8;

const TUNNELLED_RAS_FEATURE: u16 = 17;
const RAS_MESSAGE_PARAMETER: u16 = 1;
/// `Content` alternative `raw`, 12 root alternatives.
const RAW_CONTENT: u32 = 0;
const CONTENT_CHOICE_BITS: u8 = 4;
/// `GenericIdentifier` alternative `standard`, 3 root alternatives.
const STANDARD_IDENTIFIER: u32 = 0;

/// Wraps an encoded RAS message for the TLS signalling channel.
pub fn wrap_ras(ras: &[u8]) -> Result<Vec<u8>, SignalingError> {
    let user_user: Vec<u8> = encode_user_information(ras)?;
    let length: u16 = u16::try_from(user_user.len() + 1).map_err(|_| {
        SignalingError::Codec(format!("RAS message of {} bytes is too large", ras.len()))
    })?;

    let mut message: Vec<u8> = vec![
        PROTOCOL_DISCRIMINATOR,
        // call reference length 2, value 0
        0x02,
        0x00,
        0x00,
        FACILITY,
        FACILITY_IE,
        0x00,
        USER_USER_IE,
    ];
    message.extend_from_slice(&length.to_be_bytes());
    message.push(X208_DISCRIMINATOR);
    message.extend_from_slice(&user_user);
    Ok(message)
}

/// Extracts the RAS message from a Q.931 message, `None` when it carries
/// none.
pub fn unwrap_ras(message: &[u8]) -> Result<Option<Vec<u8>>, SignalingError> {
    if message.first() != Some(&PROTOCOL_DISCRIMINATOR) {
        return Err(SignalingError::Codec("not a Q.931 message".to_string()));
    }
    let reference_len: usize = usize::from(*message.get(1).ok_or_else(truncated)? & 0x0F);
    let message_type: u8 = *message.get(2 + reference_len).ok_or_else(truncated)?;
    if message_type != FACILITY {
        return Ok(None);
    }

    let Some(user_user) = find_user_user(&message[3 + reference_len..])? else {
        return Ok(None);
    };
    match user_user.split_first() {
        Some((&X208_DISCRIMINATOR, body)) => decode_user_information(body),
        Some((other, _)) => Err(SignalingError::Codec(format!(
            "unexpected user-user protocol discriminator {other:#04x}"
        ))),
        None => Err(truncated()),
    }
}

fn find_user_user(mut elements: &[u8]) -> Result<Option<&[u8]>, SignalingError> {
    while let Some(&id) = elements.first() {
        // single octet elements carry no length
        if id & 0x80 != 0 {
            elements = &elements[1..];
            continue;
        }

        let (length, header): (usize, usize) = if id == USER_USER_IE {
            let bytes: &[u8] = elements.get(1..3).ok_or_else(truncated)?;
            (usize::from(u16::from_be_bytes([bytes[0], bytes[1]])), 3)
        } else {
            (usize::from(*elements.get(1).ok_or_else(truncated)?), 2)
        };
        let contents: &[u8] = elements
            .get(header..header + length)
            .ok_or_else(truncated)?;

        if id == USER_USER_IE {
            return Ok(Some(contents));
        }
        elements = &elements[header + length..];
    }
    Ok(None)
}

/// `H323-UserInformation` with an `empty` body, H.245 tunnelling on and the
/// RAS message in `genericData`.
fn encode_user_information(ras: &[u8]) -> Result<Vec<u8>, SignalingError> {
    let mut w: PerWriter = PerWriter::default();

    // H323-UserInformation: extension, user-data absent
    w.write_bit(false);
    w.write_bit(false);
    // H323-UU-PDU: extension present, nonStandardData absent
    w.write_bit(true);
    w.write_bit(false);

    w.write_bit(true);
    w.write_small_number(EMPTY_BODY);
    w.write_open_type(&[])?;

    w.write_small_number(UU_PDU_ADDITIONS as u32 - 1);
    for index in 0..UU_PDU_ADDITIONS {
        w.write_bit(index == H245_TUNNELING || index == GENERIC_DATA);
    }
    // h245Tunneling TRUE
    w.write_open_type(&[0x80])?;
    w.write_open_type(&encode_generic_data(ras)?)?;

    Ok(w.finish())
}

fn encode_generic_data(ras: &[u8]) -> Result<Vec<u8>, SignalingError> {
    let mut w: PerWriter = PerWriter::default();

    w.write_length(1)?;
    // GenericData: extension, parameters present
    w.write_bit(false);
    w.write_bit(true);
    write_standard_identifier(&mut w, TUNNELLED_RAS_FEATURE);

    // SIZE(1..512), one parameter
    w.write_u16(0);
    // EnumeratedParameter: extension, content present
    w.write_bit(false);
    w.write_bit(true);
    write_standard_identifier(&mut w, RAS_MESSAGE_PARAMETER);

    w.write_bit(false);
    w.write_bits(RAW_CONTENT, CONTENT_CHOICE_BITS);
    w.write_length(ras.len())?;
    w.write_octets(ras);

    Ok(w.finish())
}

fn write_standard_identifier(w: &mut PerWriter, id: u16) {
    w.write_bit(false);
    w.write_bits(STANDARD_IDENTIFIER, 2);
    // INTEGER (0..16383, ...) within its root
    w.write_bit(false);
    w.write_u16(id);
}

fn decode_user_information(body: &[u8]) -> Result<Option<Vec<u8>>, SignalingError> {
    let mut r: PerReader = PerReader::new(body);

    let _user_information_extended: bool = r.read_bit()?;
    let _user_data: bool = r.read_bit()?;
    let extended: bool = r.read_bit()?;
    if r.read_bit()? {
        return Err(SignalingError::Codec(
            "nonStandardData in H323-UU-PDU is not supported".to_string(),
        ));
    }

    if !r.read_bit()? {
        // root alternatives such as setup or facility never carry RAS
        return Ok(None);
    }
    let body_kind: u32 = r.read_small_number()?;
    r.read_open_type()?;
    if body_kind != EMPTY_BODY || !extended {
        return Ok(None);
    }

    for (index, addition) in r.read_extensions()? {
        if index == GENERIC_DATA {
            return decode_generic_data(addition);
        }
    }
    Ok(None)
}

fn decode_generic_data(content: &[u8]) -> Result<Option<Vec<u8>>, SignalingError> {
    let mut r: PerReader = PerReader::new(content);

    let count: usize = r.read_length()?;
    for _ in 0..count {
        let extended: bool = r.read_bit()?;
        let has_parameters: bool = r.read_bit()?;
        let feature: u16 = read_standard_identifier(&mut r)?;

        let mut ras: Option<Vec<u8>> = None;
        if has_parameters {
            let parameters: usize = usize::from(r.read_u16()?) + 1;
            for _ in 0..parameters {
                let (parameter, raw) = read_parameter(&mut r)?;
                if feature == TUNNELLED_RAS_FEATURE && parameter == RAS_MESSAGE_PARAMETER {
                    ras = raw.map(<[u8]>::to_vec);
                }
            }
        }
        if extended {
            r.read_extensions()?;
        }

        if ras.is_some() {
            return Ok(ras);
        }
    }
    Ok(None)
}

/// Reads one `EnumeratedParameter` and returns its id and raw content.
fn read_parameter<'a>(r: &mut PerReader<'a>) -> Result<(u16, Option<&'a [u8]>), SignalingError> {
    let extended: bool = r.read_bit()?;
    let has_content: bool = r.read_bit()?;
    let id: u16 = read_standard_identifier(r)?;

    let mut raw: Option<&[u8]> = None;
    if has_content {
        if r.read_bit()? {
            return Err(SignalingError::Codec(
                "extended generic content is not supported".to_string(),
            ));
        }
        let kind: u32 = r.read_bits(CONTENT_CHOICE_BITS)?;
        if kind != RAW_CONTENT {
            return Err(SignalingError::Codec(format!(
                "generic content kind {kind} is not supported"
            )));
        }
        let length: usize = r.read_length()?;
        raw = Some(r.read_octets(length)?);
    }
    if extended {
        r.read_extensions()?;
    }
    Ok((id, raw))
}

fn read_standard_identifier(r: &mut PerReader) -> Result<u16, SignalingError> {
    if r.read_bit()? || r.read_bits(2)? != STANDARD_IDENTIFIER {
        return Err(SignalingError::Codec(
            "only standard generic identifiers are supported".to_string(),
        ));
    }
    if r.read_bit()? {
        return Err(SignalingError::Codec(
            "generic identifier outside 0..16383".to_string(),
        ));
    }
    r.read_u16()
}

fn truncated() -> SignalingError {
    SignalingError::Codec("Q.931 message truncated".to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
