//! # Core Codec Components
//!
//! Byte buffers and the TLV (type-length-value) record codec.
//!
//! ## Components
//! - **Packet**: Growable big-endian buffer plus a bounds-checked reader
//! - **Tlv**: Single tagged record and strict block parsing
//! - **Packer**: Counted TLV block builder with optional encryption
//!
//! ## Wire Format
//! ```text
//! Block: [Count(2)] [Record]*
//! TLV:   [Tag(2)] [Length(2)] [Value(Length)]
//! ```
//! All integers are big-endian.
//!
//! ## Safety
//! - TLV values are capped at 65535 bytes
//! - Record counts are checked, never wrapped
//! - Every read is bounds-checked before slicing

pub mod packer;
pub mod packet;
pub mod tlv;
