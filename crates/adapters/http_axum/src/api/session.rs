//! JSON handlers for the Session store.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use carhub_app::ports::{CommandSink, Persistence};
use carhub_domain::error::{CarHubError, ValidationError};
use carhub_domain::stats::TopicStats;
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

use crate::error::ApiError;
use crate::response::JsonResponse;
use crate::state::AppState;

/// Request body for writing a session value.
#[derive(Deserialize)]
pub struct SetRequest {
    pub value: serde_json::Value,
}

/// Echo of an accepted write.
#[derive(Debug, Serialize)]
pub struct Published {
    pub name: Topic,
    pub value: Value,
}

/// `GET /session`
pub async fn list<P, C>(
    State(state): State<AppState<P, C>>,
) -> JsonResponse<BTreeMap<Topic, Value>>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    JsonResponse::success(state.session.snapshot())
}

/// `GET /session/meta` — write statistics of every topic.
pub async fn meta<P, C>(
    State(state): State<AppState<P, C>>,
) -> JsonResponse<BTreeMap<Topic, TopicStats>>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    JsonResponse::success(state.session.all_stats())
}

/// `GET /session/{name}`
pub async fn get<P, C>(
    State(state): State<AppState<P, C>>,
    Path(name): Path<String>,
) -> Result<JsonResponse<Value>, ApiError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    state
        .session
        .get(&name)
        .map(JsonResponse::success)
        .ok_or(ApiError::Missing("Does not exist"))
}

/// `POST /session/{name}` with a `{"value": ...}` body.
///
/// A map value is decomposed into one write per leaf under `name`.
pub async fn set<P, C>(
    State(state): State<AppState<P, C>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<JsonResponse<Published>, ApiError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    if body.is_empty() {
        return Err(ApiError::BadRequest("Error: Empty body".to_string()));
    }
    let request: SetRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(error = %err, "failed to decode session write");
        ApiError::BadRequest(err.to_string())
    })?;
    let value = Value::try_from(request.value).map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let topic = Topic::new(&name);
    if topic.is_empty() {
        return Err(CarHubError::from(ValidationError::EmptyTopic).into());
    }

    for (leaf, leaf_value) in value.clone().flatten(&topic) {
        state.session.publish(leaf, leaf_value).await;
    }
    Ok(JsonResponse::success(Published { name: topic, value }))
}
