use serde::Serialize;
use tokio::sync::broadcast;

use crate::mirrors::Collection;

pub const EVENT_MIRROR_RELOADED: &str = "mirror-reloaded";
pub const EVENT_MIRRORS_CLEARED: &str = "mirrors-cleared";

/// Published by the controller whenever a mirror changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "collection", rename_all = "kebab-case")]
pub enum MirrorEvent {
    Reloaded(Collection),
    Cleared,
}

impl MirrorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reloaded(_) => EVENT_MIRROR_RELOADED,
            Self::Cleared => EVENT_MIRRORS_CLEARED,
        }
    }
}

pub fn emit_event(tx: &broadcast::Sender<MirrorEvent>, event: MirrorEvent) {
    // No receivers is the normal headless case.
    if tx.send(event).is_err() {
        tracing::trace!(event = event.name(), "No mirror event listeners");
    }
}
