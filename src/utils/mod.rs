//! # Utility Modules
//!
//! Supporting utilities for cryptography, logging, metrics and timing.
//!
//! ## Components
//! - **Crypto**: Pluggable cryptor trait and an XChaCha20-Poly1305 implementation
//! - **Logging**: Subscriber setup from `LoggingConfig`
//! - **Metrics**: Per-session counters
//! - **Timeout**: Async timeout wrappers
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom)
//! - Memory zeroing for key material (zeroize crate)

pub mod crypto;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use crypto::{ChaChaCryptor, Cryptor};
pub use metrics::{MetricsSnapshot, SessionMetrics};
