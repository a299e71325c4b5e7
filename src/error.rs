//! # Error Types
//!
//! Error handling for the packet codec and the event engine.
//!
//! This module defines every failure the protocol core can surface, from short
//! reads while decoding a TLV block to a correlated request that never got its reply.
//!
//! ## Error Categories
//! - **Malformed input**: A TLV block or event payload failed to decode
//! - **Correlation**: Reply timeout, wrong reply variant, cancelled request
//! - **Cryptographic Errors**: Failures reported by the injected cryptor
//! - **Configuration**: Invalid or unreadable session configuration
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use im_protocol::core::tlv::TlvBlock;
//! use im_protocol::error::{ProtocolError, Result};
//!
//! fn record_count(block: &[u8]) -> Result<usize> {
//!     Ok(TlvBlock::parse(block)?.len())
//! }
//!
//! match record_count(&[0x00]) {
//!     Err(ProtocolError::MalformedInput(_)) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Decoding errors
    pub const ERR_SHORT_READ: &str = "Unexpected end of input";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after last record";
    pub const ERR_RECORD_COUNT_MISMATCH: &str = "Declared record count does not match records";
    pub const ERR_MISSING_FIELD: &str = "Required TLV field missing";
    pub const ERR_INVALID_UTF8: &str = "TLV value is not valid UTF-8";
    pub const ERR_INVALID_WIDTH: &str = "TLV value has wrong width for integer";
    pub const ERR_UNKNOWN_EVENT_KIND: &str = "Unknown event kind code";
    pub const ERR_NESTING_TOO_DEEP: &str = "Nested events too deep";

    /// Cryptographic errors
    pub const ERR_INVALID_KEY_LENGTH: &str = "Key must be 32 bytes";
    pub const ERR_ENCRYPTION_FAILED: &str = "Encryption failed";
    pub const ERR_DECRYPTION_FAILED: &str = "Decryption failed";
    pub const ERR_NONCE_GENERATION: &str = "Failed to generate nonce";

    /// Session errors
    pub const ERR_TOO_MANY_PENDING: &str = "Too many requests awaiting a reply";
    pub const ERR_LOCK_POISONED: &str = "Pending request table lock poisoned";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("TLV value too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Record count exceeds 65535")]
    TooManyRecords,

    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Unexpected reply: expected {expected}, received {received}")]
    UnexpectedReply {
        expected: &'static str,
        received: &'static str,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        ProtocolError::MalformedInput(detail.into())
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
