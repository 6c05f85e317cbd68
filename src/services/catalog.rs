//! Breweries and beers.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::views::{BeerView, BreweryView, Joins};
use crate::error::ApiError;
use crate::models::{Beer, Brewery, FieldErrors, Raw};
use crate::store::{Store, UnitOfWork};

use super::{catalog_joins, consistency};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewBrewery {
    pub name: Raw,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewBeer {
    #[serde(alias = "brewery")]
    pub brewery_id: Raw,
    pub name: Raw,
    pub abv: Raw,
}

pub async fn create_brewery(store: &dyn Store, input: NewBrewery) -> Result<BreweryView, ApiError> {
    let mut errors = FieldErrors::new("Brewery");
    let name = errors.text("name", input.name);
    let name = errors.required_text("name", name);

    let mut tx = store.begin().await?;
    if let Some(name) = &name {
        if tx.brewery_by_name(name).await?.is_some() {
            errors.unique("name");
        }
    }
    errors.into_result()?;
    let Some(name) = name else {
        return Err(ApiError::internal_server_error("validated brewery name missing"));
    };

    let brewery = Brewery::new(name);
    tx.insert_brewery(&brewery).await?;
    tx.commit().await?;

    info!(brewery = %brewery.id, name = %brewery.name, "created brewery");
    Ok(Joins::new().brewery_view(&brewery))
}

pub async fn list_breweries(store: &dyn Store) -> Result<Vec<BreweryView>, ApiError> {
    let mut tx = store.begin().await?;
    let breweries = tx.breweries().await?;
    let joins = Joins::new().with_beers(tx.beers().await?);
    Ok(breweries.iter().map(|b| joins.brewery_view(b)).collect())
}

pub async fn get_brewery(store: &dyn Store, name: &str) -> Result<Option<BreweryView>, ApiError> {
    let mut tx = store.begin().await?;
    let Some(brewery) = tx.brewery_by_name(name).await? else {
        return Ok(None);
    };
    let joins = Joins::new().with_beers(tx.beers().await?);
    Ok(Some(joins.brewery_view(&brewery)))
}

pub async fn create_beer(store: &dyn Store, input: NewBeer) -> Result<BeerView, ApiError> {
    let mut errors = FieldErrors::new("Beer");
    let brewery_id = errors.id("breweryId", input.brewery_id);
    let brewery_id = errors.required("breweryId", brewery_id);
    let name = errors.text("name", input.name);
    let name = errors.required_text("name", name);
    let abv = errors.number("abv", input.abv);
    let abv = errors.required("abv", abv);
    if let Some(abv) = abv {
        errors.min("abv", abv, 0.0);
    }

    let mut tx = store.begin().await?;
    let brewery = match brewery_id {
        Some(id) => tx.brewery(id).await?,
        None => None,
    };
    if let (Some(brewery), Some(name), Some(abv)) = (&brewery, &name, abv) {
        if tx.beer_by_key(brewery.id, name, abv).await?.is_some() {
            errors.push("beer", "expected (`brewery`, `name`, `abv`) to be unique");
        }
    }
    errors.into_result()?;

    let (Some(name), Some(abv)) = (name, abv) else {
        return Err(ApiError::internal_server_error("validated beer fields missing"));
    };
    let Some(brewery) = brewery else {
        return Err(ApiError::not_found("no such brewery"));
    };

    let beer = Beer::new(brewery.id, name, abv);
    consistency::attach_beer(&mut *tx, &beer).await?;
    tx.commit().await?;

    info!(beer = %beer.id, brewery = %brewery.id, name = %beer.name, "created beer");
    Ok(Joins::new().with_breweries([brewery]).beer_view(&beer))
}

pub async fn list_beers(store: &dyn Store) -> Result<Vec<BeerView>, ApiError> {
    let mut tx = store.begin().await?;
    let beers = tx.beers().await?;
    let joins = Joins::new().with_breweries(tx.breweries().await?);
    Ok(beers.iter().map(|b| joins.beer_view(b)).collect())
}

/// `brewery` is a brewery id, or its name when it does not parse as one.
async fn resolve_brewery(tx: &mut dyn UnitOfWork, brewery: &str) -> Result<Option<Brewery>, ApiError> {
    let found = match Uuid::parse_str(brewery) {
        Ok(id) => tx.brewery(id).await?,
        Err(_) => None,
    };
    match found {
        Some(brewery) => Ok(Some(brewery)),
        None => Ok(tx.brewery_by_name(brewery).await?),
    }
}

pub async fn get_beer(store: &dyn Store, brewery: &str, name: &str, abv: f64) -> Result<Option<BeerView>, ApiError> {
    let mut tx = store.begin().await?;
    let Some(brewery) = resolve_brewery(&mut *tx, brewery).await? else {
        return Ok(None);
    };
    let Some(beer) = tx.beer_by_key(brewery.id, name, abv).await? else {
        return Ok(None);
    };
    let joins = catalog_joins(&mut *tx).await?;
    Ok(Some(joins.beer_view(&beer)))
}
