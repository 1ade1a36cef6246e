//! Raw command passthrough to the serial devices.

use axum::extract::{Path, State};

use carhub_app::ports::{CommandSink, Persistence};

use crate::error::ApiError;
use crate::response::JsonResponse;
use crate::state::AppState;

/// `GET|POST /serial/{command}` — resolves once every device echoed the
/// command.
pub async fn send<P, C>(
    State(state): State<AppState<P, C>>,
    Path(command): Path<String>,
) -> Result<JsonResponse<String>, ApiError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    state.commands.send(&command).await?;
    Ok(JsonResponse::success(command))
}
