use crate::protocol::event::ProtocolEvent;
use crate::protocol::logic::BusinessLogic;
use crate::protocol::registry::SubscriptionRegistry;
use crate::protocol::session::SessionContext;
use crate::utils::metrics::Timer;
use std::sync::Arc;
use tracing::{debug, trace};

/// Routes inbound events to subscribed modules.
///
/// Lookup and forwarding happen synchronously in the caller, so events reach the
/// dispatcher in arrival order. Module work runs in one tracked task per event;
/// a handler that suspends on a reply never holds up the next event.
pub struct Dispatcher {
    registry: SubscriptionRegistry,
}

impl Dispatcher {
    pub fn new(modules: Vec<Arc<dyn BusinessLogic>>) -> Self {
        Self {
            registry: SubscriptionRegistry::build(modules),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn dispatch(&self, ctx: &SessionContext, event: ProtocolEvent) {
        let kind = event.kind();

        if ctx.is_closed() {
            debug!(%kind, "Session closed; dropping event");
            return;
        }

        let subscribers = self.registry.subscribers(kind);
        if subscribers.is_empty() {
            trace!(%kind, "No subscribers; forwarding to entity");
            ctx.metrics().event_forwarded();
            ctx.post_event_to_entity(event);
            return;
        }

        ctx.metrics().event_dispatched();
        let task_ctx = ctx.clone();
        ctx.spawn_tracked(async move {
            for module in subscribers {
                let _timer = Timer::start(module.name());
                if let Err(error) = module.incoming(&task_ctx, event.clone()).await {
                    task_ctx.report_failure(module.name(), Some(kind), error);
                }
            }
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}
