//! # TLV Records
//!
//! A single type-length-value record and the decoder for a counted block of them.
//!
//! ## Wire Format
//! ```text
//! [Tag(2)] [Length(2)] [Value(Length)]
//! ```
//! Both header fields are big-endian. The length is always derived from the value,
//! so a `Tlv` can never declare a length that disagrees with its bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::packet::{Packet, PacketReader};
use crate::error::{constants, ProtocolError, Result};

/// Size of the tag and length header preceding every value.
pub const TLV_HEADER_LEN: usize = 4;

/// Largest value a single record can carry.
pub const MAX_TLV_VALUE_LEN: usize = u16::MAX as usize;

/// Immutable type-length-value record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tlv {
    tag: u16,
    value: Bytes,
}

impl Tlv {
    /// Build a record. Fails if the value cannot be described by a 16-bit length.
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Result<Self> {
        let value = value.into();
        if value.len() > MAX_TLV_VALUE_LEN {
            return Err(ProtocolError::OversizedPacket(value.len()));
        }
        Ok(Self { tag, value })
    }

    pub fn from_u32(tag: u16, value: u32) -> Self {
        Self {
            tag,
            value: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn from_u64(tag: u16, value: u64) -> Self {
        Self {
            tag,
            value: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn from_text(tag: u16, value: &str) -> Result<Self> {
        Self::new(tag, Bytes::copy_from_slice(value.as_bytes()))
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u16 {
        // bounded by the constructors
        self.value.len() as u16
    }

    /// Size of the full record on the wire.
    pub fn encoded_len(&self) -> usize {
        TLV_HEADER_LEN + self.value.len()
    }

    pub(crate) fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u16(self.tag);
        buf.put_u16(self.len());
        buf.extend_from_slice(&self.value);
    }

    /// Encode the record on its own.
    pub fn to_bytes(&self) -> Bytes {
        let mut packet = Packet::with_capacity(self.encoded_len());
        packet.put_tlv(self);
        packet.into_bytes()
    }

    /// Decode one record from the reader.
    pub fn decode(reader: &mut PacketReader<'_>) -> Result<Self> {
        let tag = reader.read_u16()?;
        let len = reader.read_u16()? as usize;
        let value = reader.read_bytes(len).map_err(|_| {
            ProtocolError::malformed(format!(
                "{}: TLV 0x{tag:04x} declares {len} bytes, {} available",
                constants::ERR_SHORT_READ,
                reader.remaining()
            ))
        })?;
        Ok(Self {
            tag,
            value: Bytes::copy_from_slice(value),
        })
    }

    pub fn as_u32(&self) -> Result<u32> {
        let raw: [u8; 4] = self.value.as_ref().try_into().map_err(|_| self.width_error(4))?;
        Ok(u32::from_be_bytes(raw))
    }

    pub fn as_u64(&self) -> Result<u64> {
        let raw: [u8; 8] = self.value.as_ref().try_into().map_err(|_| self.width_error(8))?;
        Ok(u64::from_be_bytes(raw))
    }

    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.value).map_err(|e| {
            ProtocolError::malformed(format!(
                "{} (tag 0x{:04x}): {e}",
                constants::ERR_INVALID_UTF8,
                self.tag
            ))
        })
    }

    fn width_error(&self, expected: usize) -> ProtocolError {
        ProtocolError::malformed(format!(
            "{} (tag 0x{:04x}): expected {expected} bytes, got {}",
            constants::ERR_INVALID_WIDTH,
            self.tag,
            self.value.len()
        ))
    }
}

/// Decoded counted block: `[Count(2)] [Record]*`.
///
/// Parsing is strict. The declared count must match the records present and no
/// bytes may trail the last record, otherwise the block would silently desync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvBlock {
    records: Vec<Tlv>,
}

impl TlvBlock {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(data);
        let count = reader.read_u16()? as usize;

        let mut records = Vec::with_capacity(count);
        for index in 0..count {
            if reader.is_empty() {
                return Err(ProtocolError::malformed(format!(
                    "{}: declared {count}, found {index}",
                    constants::ERR_RECORD_COUNT_MISMATCH
                )));
            }
            records.push(Tlv::decode(&mut reader)?);
        }

        if !reader.is_empty() {
            return Err(ProtocolError::malformed(format!(
                "{}: {} bytes",
                constants::ERR_TRAILING_BYTES,
                reader.remaining()
            )));
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Tlv] {
        &self.records
    }

    /// First record with the given tag.
    pub fn get(&self, tag: u16) -> Option<&Tlv> {
        self.records.iter().find(|tlv| tlv.tag == tag)
    }

    pub fn require(&self, tag: u16) -> Result<&Tlv> {
        self.get(tag).ok_or_else(|| {
            ProtocolError::malformed(format!("{}: 0x{tag:04x}", constants::ERR_MISSING_FIELD))
        })
    }

    /// Every record with the given tag, in wire order.
    pub fn all(&self, tag: u16) -> impl Iterator<Item = &Tlv> {
        self.records.iter().filter(move |tlv| tlv.tag == tag)
    }

    pub fn into_records(self) -> Vec<Tlv> {
        self.records
    }
}
