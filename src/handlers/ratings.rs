// handlers/ratings.rs - /ratings

use axum::extract::State;

use crate::api::views::RatingView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::possession::{self, RatingInput};
use crate::state::AppState;

pub async fn ratings_get(State(state): State<AppState>) -> ApiResult<Vec<RatingView>> {
    Ok(ApiResponse::ok(possession::list_ratings(state.store.as_ref()).await?))
}

pub async fn ratings_post(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(input): ApiJson<RatingInput>,
) -> ApiResult<RatingView> {
    let rating = possession::add_rating(state.store.as_ref(), caller.id, input).await?;
    Ok(ApiResponse::ok(rating))
}
