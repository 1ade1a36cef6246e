//! Shared application state for axum handlers.

use std::sync::Arc;

use carhub_app::event_store::{EventStore, SessionStore};
use carhub_app::ports::{CommandSink, Persistence};

/// Application state shared across all axum handlers.
///
/// Generic over the Settings persistence and the command sink to avoid
/// dynamic dispatch. `Clone` is implemented manually so only the `Arc`
/// wrappers are cloned.
pub struct AppState<P, C> {
    /// Durable Settings store.
    pub settings: Arc<EventStore<P>>,
    /// Ephemeral Session store.
    pub session: Arc<SessionStore>,
    /// Where `/serial/{command}` requests go.
    pub commands: Arc<C>,
}

impl<P, C> Clone for AppState<P, C> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            session: Arc::clone(&self.session),
            commands: Arc::clone(&self.commands),
        }
    }
}

impl<P, C> AppState<P, C>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    /// Create the state from stores already shared with background tasks.
    #[must_use]
    pub fn new(
        settings: Arc<EventStore<P>>,
        session: Arc<SessionStore>,
        commands: Arc<C>,
    ) -> Self {
        Self {
            settings,
            session,
            commands,
        }
    }
}
