//! Presentation-facing command handlers.
//!
//! Each sub-module groups related commands by domain.  Handlers return
//! camelCase DTOs and map every failure to a short user-facing message; the
//! detailed reason is logged where it is detected.

pub mod chat;
pub mod donations;
pub mod friends;
pub mod presence;

use std::sync::Arc;

use crate::controller::SyncController;
use crate::state::AppState;

pub(crate) fn controller(state: &AppState) -> Result<Arc<SyncController>, String> {
    state
        .controller()
        .ok_or_else(|| "Not signed in".to_string())
}

/// Whether the initial bulk load is still running.
pub fn is_loading(state: &AppState) -> bool {
    state.controller().is_some_and(|c| c.is_loading())
}
