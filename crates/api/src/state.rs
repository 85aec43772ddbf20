//! Shared application state.

use std::sync::Arc;

use common::{Clock, SystemClock};
use resource_store::ResourceStore;
use saga::{InMemoryIdentityProvider, InMemoryInvitationSender, SagaCoordinator};

use crate::config::Config;

/// Coordinator wired to the in-process identity provider and mailer.
pub type Coordinator<S> = SagaCoordinator<S, InMemoryIdentityProvider, InMemoryInvitationSender>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ResourceStore + Clone> {
    pub coordinator: Coordinator<S>,
}

impl<S: ResourceStore + Clone> AppState<S> {
    pub fn store(&self) -> &S {
        self.coordinator.store()
    }
}

/// Creates the application state over `store` using the system clock.
pub fn create_default_state<S: ResourceStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    create_state(store, Arc::new(SystemClock), config)
}

/// Creates the application state with an explicit clock.
pub fn create_state<S: ResourceStore + Clone + 'static>(
    store: S,
    clock: Arc<dyn Clock>,
    config: &Config,
) -> Arc<AppState<S>> {
    let coordinator = SagaCoordinator::new(
        store,
        InMemoryIdentityProvider::new(),
        InMemoryInvitationSender::new(),
        clock,
        config.saga_config(),
    );
    Arc::new(AppState { coordinator })
}
