//! # im-protocol
//!
//! Packet codec and business-logic event engine for an instant-messaging client.
//!
//! The crate has two halves:
//! - **Codec** (`core`): TLV records packed into counted blocks, optionally encrypted
//! - **Engine** (`protocol`): kind-based dispatch to business logic modules,
//!   request/response correlation and the session state that spans exchanges
//!
//! Transport, login and persistence live outside this crate. The embedding
//! application feeds decoded frames in and drains the channels it gets back.
//!
//! ## Example
//! ```rust,no_run
//! use im_protocol::protocol::{InboundFrame, Session};
//! use im_protocol::protocol::event::PushConfigEvent;
//!
//! # async fn demo() -> im_protocol::Result<()> {
//! let (session, mut channels) = Session::builder(10000).build()?;
//!
//! session.handle_frame(InboundFrame::new(
//!     1,
//!     PushConfigEvent {
//!         host: "1.2.3.4".into(),
//!         ticket: bytes::Bytes::from_static(&[0x01, 0x02]),
//!     },
//! ));
//!
//! while let Ok(frame) = channels.outbound.try_recv() {
//!     println!("send {} ({} bytes)", frame.kind, frame.payload.len());
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use config::SessionConfig;
pub use error::{ProtocolError, Result};
pub use utils::logging::init_logging;
