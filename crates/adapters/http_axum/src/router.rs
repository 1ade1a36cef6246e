//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use carhub_app::ports::{CommandSink, Persistence};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<P, C>(state: AppState<P, C>) -> Router
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes::<P, C>())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
