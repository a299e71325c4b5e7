//! # Event Engine
//!
//! Business-logic routing for inbound protocol events.
//!
//! ## Components
//! - **Event**: The closed set of protocol events and their payloads
//! - **Wire**: Event <-> TLV block mapping
//! - **Registry / Dispatcher**: Kind-based subscription and fan-out
//! - **Session**: Request/response correlation and the module-facing context
//! - **State**: Sync cursor and transient endpoint shared across exchanges
//! - **Push**: Reference module for server pushes
//!
//! ## Flow
//! ```text
//! transport -> Session::handle_frame -> pending reply?  -> waiting request
//!                                    -> Dispatcher      -> modules / entity channel
//! ```

pub mod dispatcher;
pub mod event;
pub mod logic;
pub mod push;
pub mod registry;
pub mod session;
pub mod state;
pub mod wire;


pub use event::{EventKind, NotifyType, ProtocolEvent, ReplyEvent};
pub use logic::{default_modules, BusinessLogic};
pub use session::{
    HandlerFailure, InboundFrame, OutboundFrame, Session, SessionBuilder, SessionChannels,
    SessionContext,
};
pub use state::{HighwayEndpoint, PullTicket, SessionState};
