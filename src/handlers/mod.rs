// handlers/mod.rs - one module per resource
//
// Public reads take no extractor; writes take `AuthUser`, which rejects the
// request before the handler runs when the bearer token is missing or bad.

pub mod beers;
pub mod breweries;
pub mod bottles;
pub mod health;
pub mod login;
pub mod pictures;
pub mod ratings;
pub mod users;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids that do not parse name nothing, so they are answered like a miss.
fn parse_id(raw: &str, missing: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(missing))
}
