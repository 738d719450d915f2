//! Registration handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::users::{RegisterRequest, UserView};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

/// Register a new user
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let Json(request) = payload.map_err(bad_json)?;
    let user = state.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}
