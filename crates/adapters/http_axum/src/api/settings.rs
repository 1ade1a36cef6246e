//! JSON handlers for the Settings store.

use std::collections::BTreeMap;

use axum::extract::{Path, State};

use carhub_app::ports::{CommandSink, Persistence};
use carhub_domain::error::{CarHubError, ValidationError};
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

use crate::error::ApiError;
use crate::response::JsonResponse;
use crate::state::AppState;

/// `GET /settings`
pub async fn list<P, C>(
    State(state): State<AppState<P, C>>,
) -> JsonResponse<BTreeMap<Topic, Value>>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    tracing::debug!("responding with every setting");
    JsonResponse::success(state.settings.snapshot())
}

/// `GET /settings/{key}`
pub async fn get<P, C>(
    State(state): State<AppState<P, C>>,
    Path(key): Path<String>,
) -> Result<JsonResponse<Value>, ApiError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    state
        .settings
        .get(&key)
        .map(JsonResponse::success)
        .ok_or(ApiError::Missing("Setting not found."))
}

/// `POST /settings/{key}/{value}` — the value is stored as a string and
/// persisted before the response.
pub async fn set<P, C>(
    State(state): State<AppState<P, C>>,
    Path((key, value)): Path<(String, String)>,
) -> Result<JsonResponse<Topic>, ApiError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    let topic = Topic::new(&key);
    if topic.is_empty() {
        return Err(CarHubError::from(ValidationError::EmptyTopic).into());
    }
    tracing::debug!(%topic, %value, "updating setting");
    state.settings.publish(topic.clone(), value).await;
    Ok(JsonResponse::success(topic))
}
