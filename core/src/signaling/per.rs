//! Aligned PER (X.691) primitives shared by the RAS and Q.931 codecs.
//!
//! Only the constructs the signalling messages use are covered: single bits,
//! constrained whole numbers of at most two octets, length determinants below
//! 16K, normally small numbers and open types.

use gkprobe_common::error::SignalingError;

/// Lengths from here on need fragmentation, which is never produced.
const FRAGMENT_THRESHOLD: usize = 16384;
const SHORT_LENGTH_LIMIT: usize = 128;
const SMALL_NUMBER_LIMIT: u32 = 64;

/// Bit oriented writer for aligned PER.
#[derive(Debug, Default)]
pub(crate) struct PerWriter {
    bytes: Vec<u8>,
    /// Bits already used in the last byte, `0` when aligned.
    used: u8,
}

impl PerWriter {
    pub(crate) fn write_bit(&mut self, bit: bool) {
        if self.used == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> self.used;
            }
        }
        self.used = (self.used + 1) % 8;
    }

    pub(crate) fn write_bits(&mut self, value: u32, count: u8) {
        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    pub(crate) fn align(&mut self) {
        self.used = 0;
    }

    pub(crate) fn write_octet(&mut self, value: u8) {
        self.align();
        self.bytes.push(value);
    }

    pub(crate) fn write_octets(&mut self, values: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(values);
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        self.write_octets(&value.to_be_bytes());
    }

    /// Unconstrained length determinant, one octet below 128, two below 16K.
    pub(crate) fn write_length(&mut self, length: usize) -> Result<(), SignalingError> {
        if length < SHORT_LENGTH_LIMIT {
            self.write_octet(length as u8);
        } else if length < FRAGMENT_THRESHOLD {
            self.write_u16(0x8000 | length as u16);
        } else {
            return Err(SignalingError::Codec(format!(
                "length {length} needs PER fragmentation"
            )));
        }
        Ok(())
    }

    /// Normally small non-negative whole number, as used for extension
    /// choice indexes and extension bitmap lengths.
    pub(crate) fn write_small_number(&mut self, value: u32) {
        debug_assert!(value < SMALL_NUMBER_LIMIT);
        self.write_bit(false);
        self.write_bits(value, 6);
    }

    /// Length prefixed complete encoding. An empty encoding still takes one
    /// octet.
    pub(crate) fn write_open_type(&mut self, content: &[u8]) -> Result<(), SignalingError> {
        if content.is_empty() {
            self.write_length(1)?;
            self.write_octet(0);
        } else {
            self.write_length(content.len())?;
            self.write_octets(content);
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Bit oriented reader for aligned PER.
#[derive(Debug)]
pub(crate) struct PerReader<'a> {
    bytes: &'a [u8],
    /// Absolute bit position.
    position: usize,
}

impl<'a> PerReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn read_bit(&mut self) -> Result<bool, SignalingError> {
        let byte: u8 = *self
            .bytes
            .get(self.position / 8)
            .ok_or_else(truncated)?;
        let bit: bool = byte & (0x80 >> (self.position % 8)) != 0;
        self.position += 1;
        Ok(bit)
    }

    pub(crate) fn read_bits(&mut self, count: u8) -> Result<u32, SignalingError> {
        let mut value: u32 = 0;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    pub(crate) fn align(&mut self) {
        self.position = self.position.div_ceil(8) * 8;
    }

    pub(crate) fn read_octets(&mut self, count: usize) -> Result<&'a [u8], SignalingError> {
        self.align();
        let start: usize = self.position / 8;
        let octets: &'a [u8] = self
            .bytes
            .get(start..start + count)
            .ok_or_else(truncated)?;
        self.position += count * 8;
        Ok(octets)
    }

    pub(crate) fn read_octet(&mut self) -> Result<u8, SignalingError> {
        Ok(self.read_octets(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, SignalingError> {
        let octets: &[u8] = self.read_octets(2)?;
        Ok(u16::from_be_bytes([octets[0], octets[1]]))
    }

    pub(crate) fn read_length(&mut self) -> Result<usize, SignalingError> {
        let first: u8 = self.read_octet()?;
        match first & 0xC0 {
            0x00 | 0x40 => Ok(usize::from(first)),
            0x80 => {
                let second: u8 = self.read_octet()?;
                Ok((usize::from(first & 0x3F) << 8) | usize::from(second))
            }
            _ => Err(SignalingError::Codec(
                "fragmented PER length is not supported".to_string(),
            )),
        }
    }

    pub(crate) fn read_small_number(&mut self) -> Result<u32, SignalingError> {
        if self.read_bit()? {
            return Err(SignalingError::Codec(
                "PER small number above 63 is not supported".to_string(),
            ));
        }
        self.read_bits(6)
    }

    pub(crate) fn read_open_type(&mut self) -> Result<&'a [u8], SignalingError> {
        let length: usize = self.read_length()?;
        self.read_octets(length)
    }

    /// Reads the extension presence bitmap and returns the contents of the
    /// additions that are present, indexed by their position.
    pub(crate) fn read_extensions(&mut self) -> Result<Vec<(usize, &'a [u8])>, SignalingError> {
        let count: usize = self.read_small_number()? as usize + 1;
        let mut present: Vec<usize> = Vec::new();
        for index in 0..count {
            if self.read_bit()? {
                present.push(index);
            }
        }

        let mut additions: Vec<(usize, &'a [u8])> = Vec::with_capacity(present.len());
        for index in present {
            additions.push((index, self.read_open_type()?));
        }
        Ok(additions)
    }
}

fn truncated() -> SignalingError {
    SignalingError::Codec("PER encoding truncated".to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
