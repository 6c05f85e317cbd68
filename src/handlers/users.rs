// handlers/users.rs - /users and /users/:id

use axum::extract::{Path, State};

use super::parse_id;
use crate::api::views::UserView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::identity::{self, NewUser, UserUpdate};
use crate::state::AppState;

pub async fn users_get(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    Ok(ApiResponse::ok(identity::list_users(state.store.as_ref()).await?))
}

pub async fn user_get(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<UserView> {
    let user = identity::find_user(state.store.as_ref(), &username).await?;
    Ok(ApiResponse::found(user))
}

pub async fn users_post(State(state): State<AppState>, ApiJson(input): ApiJson<NewUser>) -> ApiResult<UserView> {
    let user = identity::register(state.store.as_ref(), &state.security, input).await?;
    Ok(ApiResponse::ok(user))
}

pub async fn user_put(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UserUpdate>,
) -> ApiResult<UserView> {
    let id = parse_id(&id, "no such user")?;
    let user = identity::update_user(state.store.as_ref(), &state.security, id, caller.id, input).await?;
    Ok(ApiResponse::created(user))
}

pub async fn user_delete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "no such user")?;
    identity::remove_user(state.store.as_ref(), id, caller.id).await?;
    Ok(ApiResponse::no_content())
}
