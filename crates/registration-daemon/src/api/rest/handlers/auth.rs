//! Login handler

use super::users::bad_json;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::users::{LoginRequest, UserView};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<UserView>> {
    let Json(request) = payload.map_err(bad_json)?;
    let user = state.users.login(request).await?;
    Ok(Json(user))
}
