// handlers/breweries.rs - /breweries

use axum::extract::{Path, State};

use crate::api::views::BreweryView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::catalog::{self, NewBrewery};
use crate::state::AppState;

pub async fn breweries_get(State(state): State<AppState>) -> ApiResult<Vec<BreweryView>> {
    Ok(ApiResponse::ok(catalog::list_breweries(state.store.as_ref()).await?))
}

pub async fn brewery_get(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<BreweryView> {
    Ok(ApiResponse::found(catalog::get_brewery(state.store.as_ref(), &name).await?))
}

pub async fn breweries_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(input): ApiJson<NewBrewery>,
) -> ApiResult<BreweryView> {
    Ok(ApiResponse::ok(catalog::create_brewery(state.store.as_ref(), input).await?))
}
