//! Event subscription registry.
//!
//! Built once from the session's module list and read-only afterwards. Each
//! module's `subscriptions()` is collected into a kind -> modules map; modules
//! keep their registration order under every kind.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::protocol::event::EventKind;
use crate::protocol::logic::BusinessLogic;

pub struct SubscriptionRegistry {
    modules: Vec<Arc<dyn BusinessLogic>>,
    by_kind: HashMap<EventKind, Vec<usize>>,
}

impl SubscriptionRegistry {
    pub fn build(modules: Vec<Arc<dyn BusinessLogic>>) -> Self {
        let mut by_kind: HashMap<EventKind, Vec<usize>> = HashMap::new();

        for (index, module) in modules.iter().enumerate() {
            for &kind in module.subscriptions() {
                let subscribers = by_kind.entry(kind).or_default();
                // a module listing a kind twice still runs once per event
                if !subscribers.contains(&index) {
                    subscribers.push(index);
                }
            }
            debug!(
                module = module.name(),
                kinds = ?module.subscriptions(),
                "Registered business logic"
            );
        }

        Self { modules, by_kind }
    }

    /// Modules subscribed to `kind`, in registration order.
    pub fn subscribers(&self, kind: EventKind) -> Vec<Arc<dyn BusinessLogic>> {
        self.by_kind
            .get(&kind)
            .map(|indices| indices.iter().map(|&i| Arc::clone(&self.modules[i])).collect())
            .unwrap_or_default()
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    pub fn modules(&self) -> &[Arc<dyn BusinessLogic>] {
        &self.modules
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field(
                "modules",
                &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}
