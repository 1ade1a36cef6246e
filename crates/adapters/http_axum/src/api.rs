//! JSON handlers, one module per resource.

#[allow(clippy::missing_errors_doc)]
pub mod serial;
#[allow(clippy::missing_errors_doc)]
pub mod session;
#[allow(clippy::missing_errors_doc)]
pub mod settings;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use carhub_app::ports::{CommandSink, Persistence};

use crate::state::AppState;

/// Build the store and serial routes.
pub fn routes<P, C>() -> Router<AppState<P, C>>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    Router::new()
        // Session
        .route("/session", get(session::list::<P, C>))
        .route("/session/meta", get(session::meta::<P, C>))
        .route("/session/stream", get(sse::stream::<P, C>))
        .route(
            "/session/{name}",
            get(session::get::<P, C>).post(session::set::<P, C>),
        )
        // Settings
        .route("/settings", get(settings::list::<P, C>))
        .route("/settings/{key}", get(settings::get::<P, C>))
        .route("/settings/{key}/{value}", post(settings::set::<P, C>))
        // Serial
        .route(
            "/serial/{command}",
            get(serial::send::<P, C>).post(serial::send::<P, C>),
        )
}
