// handlers/beers.rs - /beers

use axum::extract::{Path, State};

use crate::api::views::BeerView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::catalog::{self, NewBeer};
use crate::state::AppState;

pub async fn beers_get(State(state): State<AppState>) -> ApiResult<Vec<BeerView>> {
    Ok(ApiResponse::ok(catalog::list_beers(state.store.as_ref()).await?))
}

/// GET /beers/:brewery/:name/:abv. An abv that is not a number matches nothing.
pub async fn beer_get(
    State(state): State<AppState>,
    Path((brewery, name, abv)): Path<(String, String, String)>,
) -> ApiResult<BeerView> {
    let Ok(abv) = abv.parse::<f64>() else {
        return Ok(ApiResponse::no_content());
    };
    let beer = catalog::get_beer(state.store.as_ref(), &brewery, &name, abv).await?;
    Ok(ApiResponse::found(beer))
}

pub async fn beers_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(input): ApiJson<NewBeer>,
) -> ApiResult<BeerView> {
    Ok(ApiResponse::ok(catalog::create_beer(state.store.as_ref(), input).await?))
}
