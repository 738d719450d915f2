//! Password policy parameter handlers

use super::users::bad_json;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use registration_policy::{ParameterTypeRecord, ParameterView};
use serde::{Deserialize, Serialize};

/// Upsert-by-type request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertByTypeRequest {
    pub type_id: i64,
    pub value: String,
}

/// Value passed as `?value=...`
#[derive(Debug, Default, Deserialize)]
pub struct ValueQuery {
    pub value: Option<String>,
}

/// Value passed as a JSON body
#[derive(Debug, Deserialize)]
pub struct ValueBody {
    pub value: String,
}

/// Current matcher pattern
#[derive(Debug, Serialize)]
pub struct PatternResponse {
    pub pattern: String,
}

/// List all active parameters
pub async fn list_configurations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ParameterView>>> {
    Ok(Json(state.admin.get_all().await?))
}

/// List the parameter type catalog
pub async fn list_configuration_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ParameterTypeRecord>>> {
    Ok(Json(state.admin.list_types().await?))
}

/// Show the pattern the current policy compiles to
pub async fn get_pattern(State(state): State<AppState>) -> ApiResult<Json<PatternResponse>> {
    let pattern = state.admin.describe().await?;
    Ok(Json(PatternResponse { pattern }))
}

/// Get one parameter by key
pub async fn get_configuration(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<ParameterView>> {
    Ok(Json(state.admin.get_by_key(&key).await?))
}

/// Upsert a parameter identified by its type id
pub async fn upsert_configuration(
    State(state): State<AppState>,
    payload: Result<Json<UpsertByTypeRequest>, JsonRejection>,
) -> ApiResult<Json<ParameterView>> {
    let Json(request) = payload.map_err(bad_json)?;
    let view = state
        .admin
        .upsert_by_type_id(request.type_id, &request.value)
        .await?;

    tracing::info!(type_id = request.type_id, key = %view.key, "Updated configuration");
    Ok(Json(view))
}

/// Upsert a parameter by key; the value comes from the query or the body.
///
/// Serves both `PUT /configurations/:key` and `PUT /configurations/:key/value`.
pub async fn upsert_configuration_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ValueQuery>,
    body: Bytes,
) -> ApiResult<Json<ParameterView>> {
    let value = match query.value {
        Some(value) => value,
        None if body.is_empty() => {
            return Err(ApiError::BadRequest(
                "value is required as a query parameter or JSON body".to_string(),
            ))
        }
        None => {
            serde_json::from_slice::<ValueBody>(&body)
                .map_err(|err| ApiError::BadRequest(format!("invalid body: {}", err)))?
                .value
        }
    };

    let view = state.admin.upsert_by_key(&key, &value).await?;

    tracing::info!(key = %key, "Updated configuration");
    Ok(Json(view))
}
