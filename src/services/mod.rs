//! Request-level operations. Each one opens a unit of work, checks the
//! caller and the input, writes, and commits only when every step passed.

pub mod catalog;
pub mod consistency;
pub mod identity;
pub mod possession;

use uuid::Uuid;

use crate::api::views::Joins;
use crate::error::ApiError;
use crate::store::{StoreResult, UnitOfWork};

/// Fails with 404 when an optional picture reference does not resolve.
async fn ensure_picture(tx: &mut dyn UnitOfWork, picture: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(id) = picture {
        if tx.picture(id).await?.is_none() {
            return Err(ApiError::not_found("no such picture"));
        }
    }
    Ok(())
}

/// Breweries and beers, enough to render any embedded beer.
async fn catalog_joins(tx: &mut dyn UnitOfWork) -> StoreResult<Joins> {
    Ok(Joins::new()
        .with_breweries(tx.breweries().await?)
        .with_beers(tx.beers().await?))
}
