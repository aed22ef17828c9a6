//! Session-scoped application state.
//!
//! [`AppState`] is shared by every command handler.  It owns the backend
//! handle and, while a user is signed in, that user's [`SyncController`].

use std::sync::Arc;

use studyhall_shared::UserId;
use tracing::info;

use crate::backend::RemoteBackend;
use crate::config::ClientConfig;
use crate::controller::SyncController;

/// Central application state.
pub struct AppState {
    config: ClientConfig,

    /// Backend every controller and the donation form write through.
    backend: Arc<dyn RemoteBackend>,

    /// `None` while signed out.
    controller: Option<Arc<SyncController>>,
}

impl AppState {
    pub fn new(config: ClientConfig, backend: Arc<dyn RemoteBackend>) -> Self {
        Self {
            config,
            backend,
            controller: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn RemoteBackend> {
        Arc::clone(&self.backend)
    }

    pub fn controller(&self) -> Option<Arc<SyncController>> {
        self.controller.clone()
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.controller.as_ref().map(|c| c.user_id())
    }

    /// Start syncing for `user`. Signing in again as the same user keeps the
    /// running controller; a different user replaces it.
    pub async fn sign_in(&mut self, user: UserId) -> Arc<SyncController> {
        if let Some(existing) = &self.controller {
            if existing.user_id() == user {
                return Arc::clone(existing);
            }
        }
        self.sign_out();

        let controller = Arc::new(SyncController::new(
            Arc::clone(&self.backend),
            user,
            self.config.feed_window,
        ));
        controller.start().await;
        info!(user = %user, "Signed in");

        self.controller = Some(Arc::clone(&controller));
        controller
    }

    /// Tear down the current controller, clearing its mirrors.
    pub fn sign_out(&mut self) {
        if let Some(controller) = self.controller.take() {
            controller.teardown();
            info!(user = %controller.user_id(), "Signed out");
        }
    }
}
