//! Business logic module contract and the compile-time module list.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::event::{EventKind, ProtocolEvent};
use crate::protocol::push::PushEventLogic;
use crate::protocol::session::SessionContext;

/// A unit of protocol behavior.
///
/// Modules are stateless across invocations; anything that must persist between
/// events lives in the session's `SessionState`. `incoming` may suspend on
/// correlated requests, and several invocations may be in flight at once.
#[async_trait]
pub trait BusinessLogic: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Event kinds this module wants to receive.
    fn subscriptions(&self) -> &'static [EventKind];

    async fn incoming(&self, ctx: &SessionContext, event: ProtocolEvent) -> Result<()>;
}

pub type LogicConstructor = fn() -> Arc<dyn BusinessLogic>;

/// Modules every session starts with, in registration order.
pub const DEFAULT_MODULES: &[LogicConstructor] = &[PushEventLogic::construct];

pub fn default_modules() -> Vec<Arc<dyn BusinessLogic>> {
    DEFAULT_MODULES.iter().map(|construct| construct()).collect()
}
