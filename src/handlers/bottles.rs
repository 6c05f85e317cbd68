// handlers/bottles.rs - /bottles and /bottles/:id

use axum::extract::{Path, State};

use super::parse_id;
use crate::api::views::BottleView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::possession::{self, BottleInput};
use crate::state::AppState;

pub async fn bottles_get(State(state): State<AppState>) -> ApiResult<Vec<BottleView>> {
    Ok(ApiResponse::ok(possession::list_bottles(state.store.as_ref()).await?))
}

pub async fn bottles_post(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(input): ApiJson<BottleInput>,
) -> ApiResult<BottleView> {
    let bottle = possession::add_bottle(state.store.as_ref(), caller.id, input).await?;
    Ok(ApiResponse::ok(bottle))
}

pub async fn bottle_put(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<BottleInput>,
) -> ApiResult<BottleView> {
    let id = parse_id(&id, "no such bottle")?;
    let bottle = possession::update_bottle(state.store.as_ref(), id, caller.id, input).await?;
    Ok(ApiResponse::created(bottle))
}

pub async fn bottle_delete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "no such bottle")?;
    possession::delete_bottle(state.store.as_ref(), id, caller.id).await?;
    Ok(ApiResponse::no_content())
}
