// handlers/login.rs - POST /login

use axum::extract::State;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::identity::{self, Credentials, LoginResponse};
use crate::state::AppState;

/// A missing or unreadable body is treated as absent credentials.
pub async fn login_post(
    State(state): State<AppState>,
    body: Option<ApiJson<Credentials>>,
) -> ApiResult<LoginResponse> {
    let credentials = body.map(|ApiJson(credentials)| credentials);
    let login = identity::authenticate(state.store.as_ref(), &state.security, credentials).await?;
    Ok(ApiResponse::ok(login))
}
