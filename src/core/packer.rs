//! # TLV Packer
//!
//! Accumulates TLV records, either freshly built `Tlv` values or pre-encoded byte
//! runs, and emits them as one counted block:
//!
//! ```text
//! [Count(2)] [Record]*
//! ```
//!
//! Record counting is kept apart from byte accumulation so a single block can mix
//! pass-through blobs with new values without double counting.

use bytes::Bytes;
use tracing::trace;

use crate::core::packet::Packet;
use crate::core::tlv::Tlv;
use crate::error::{ProtocolError, Result};
use crate::utils::crypto::Cryptor;

/// Whether the finalized block should carry its record count.
///
/// The count is currently emitted for both variants. Peers expect the prefix on
/// every block and no capture has shown a block without it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPrefix {
    #[default]
    Always,
    Omit,
}

impl From<bool> for CountPrefix {
    fn from(prefix: bool) -> Self {
        if prefix {
            CountPrefix::Always
        } else {
            CountPrefix::Omit
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlvPacker {
    count: u16,
    body: Packet,
}

impl TlvPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append pre-encoded record bytes verbatim.
    ///
    /// `None` and empty slices are skipped without touching the count. The caller
    /// vouches that the bytes already form a valid record.
    pub fn put_raw<'a>(&mut self, data: impl Into<Option<&'a [u8]>>) -> Result<&mut Self> {
        match data.into() {
            Some(bytes) if !bytes.is_empty() => {
                self.bump()?;
                self.body.put_bytes(bytes);
            }
            _ => {}
        }
        Ok(self)
    }

    /// Append a record. `None` is skipped without touching the count.
    pub fn put_tlv<'a>(&mut self, tlv: impl Into<Option<&'a Tlv>>) -> Result<&mut Self> {
        if let Some(tlv) = tlv.into() {
            self.bump()?;
            self.body.put_tlv(tlv);
        }
        Ok(self)
    }

    fn bump(&mut self) -> Result<()> {
        self.count = self.count.checked_add(1).ok_or(ProtocolError::TooManyRecords)?;
        Ok(())
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Build the counted block. The packer is left untouched and may be finalized again.
    pub fn finalize(&self, prefix: CountPrefix) -> Packet {
        if prefix == CountPrefix::Omit {
            trace!("count prefix omission requested; emitting prefixed block");
        }

        let mut packet = Packet::with_capacity(2 + self.body.len());
        packet.put_u16(self.count);
        packet.put_packet(&self.body);
        packet
    }

    pub fn to_bytes(&self, prefix: CountPrefix) -> Bytes {
        self.finalize(prefix).into_bytes()
    }

    /// Finalize and pass the whole block through `cryptor`.
    ///
    /// Cryptor errors are returned exactly as the cryptor produced them.
    pub fn finalize_encrypted(
        &self,
        prefix: CountPrefix,
        cryptor: &dyn Cryptor,
        key: &[u8],
    ) -> Result<Vec<u8>> {
        let plain = self.finalize(prefix);
        cryptor.encrypt(plain.as_slice(), key)
    }
}
