//! Bottles, ratings and pictures. Every one of them belongs to a user.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::views::{BottleView, Joins, PictureView, RatingView};
use crate::error::ApiError;
use crate::models::{bottle, picture, rating};
use crate::models::{Bottle, FieldErrors, Picture, Rating, Raw};
use crate::store::{Store, UnitOfWork};

use super::{catalog_joins, consistency, ensure_picture};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BottleInput {
    #[serde(alias = "beer")]
    pub beer_id: Raw,
    pub count: Raw,
    pub volume: Raw,
    pub price: Raw,
    pub bottled: Raw,
    pub expiration: Raw,
    pub added: Raw,
    #[serde(alias = "picture")]
    pub picture_id: Raw,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingInput {
    #[serde(alias = "beer")]
    pub beer_id: Raw,
    pub aroma: Raw,
    pub taste: Raw,
    pub mouthfeel: Raw,
    pub appearance: Raw,
    pub overall: Raw,
    pub description: Raw,
    #[serde(alias = "ageofbeer")]
    pub age_of_beer: Raw,
    #[serde(alias = "picture")]
    pub picture_id: Raw,
}

#[derive(Debug)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Bottle fields that passed validation; owner and id are filled in later.
struct BottleFields {
    beer: Uuid,
    count: i32,
    volume: f64,
    price: Option<f64>,
    bottled: Option<DateTime<Utc>>,
    expiration: Option<DateTime<Utc>>,
    added: Option<DateTime<Utc>>,
    picture: Option<Uuid>,
}

impl BottleFields {
    fn into_bottle(self, id: Uuid, user: Uuid) -> Bottle {
        Bottle {
            id,
            count: self.count,
            volume: self.volume,
            price: self.price,
            bottled: self.bottled,
            expiration: self.expiration,
            added: self.added,
            beer: self.beer,
            user,
            picture: self.picture,
        }
    }
}

fn validate_bottle(input: BottleInput) -> Result<BottleFields, ApiError> {
    let mut errors = FieldErrors::new("Bottle");

    let beer = errors.id("beer", input.beer_id);
    let beer = errors.required("beer", beer);
    let count = errors.integer("count", input.count);
    let count = errors.required("count", count);
    if let Some(count) = count {
        errors.range("count", count, 0, bottle::COUNT_MAX);
    }
    let volume = errors.number("volume", input.volume);
    let volume = errors.required("volume", volume);
    if let Some(volume) = volume {
        errors.range("volume", volume, 0.0, bottle::VOLUME_MAX);
    }
    let price = errors.number("price", input.price);
    if let Some(price) = price {
        errors.range("price", price, 0.0, bottle::PRICE_MAX);
    }
    let mut date = |field: &str, raw: Raw| {
        let value = errors.date(field, raw);
        if let Some(value) = value {
            errors.date_window(field, value);
        }
        value
    };
    let bottled = date("bottled", input.bottled);
    let expiration = date("expiration", input.expiration);
    let added = date("added", input.added);
    let picture = errors.id("picture", input.picture_id);
    errors.into_result()?;

    match (beer, count, volume) {
        (Some(beer), Some(count), Some(volume)) => Ok(BottleFields {
            beer,
            count,
            volume,
            price,
            bottled,
            expiration,
            added,
            picture,
        }),
        _ => Err(ApiError::internal_server_error("validated bottle fields missing")),
    }
}

async fn ensure_beer(tx: &mut dyn UnitOfWork, beer: Uuid) -> Result<(), ApiError> {
    match tx.beer(beer).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("no such beer")),
    }
}

/// Bottle with its beer, brewery and owner resolved.
async fn bottle_view(tx: &mut dyn UnitOfWork, bottle: &Bottle) -> Result<BottleView, ApiError> {
    let owner = tx.user(bottle.user).await?;
    let joins = catalog_joins(tx).await?.with_users(owner);
    Ok(joins.bottle_view(bottle))
}

pub async fn add_bottle(store: &dyn Store, owner: Uuid, input: BottleInput) -> Result<BottleView, ApiError> {
    let fields = validate_bottle(input)?;

    let mut tx = store.begin().await?;
    ensure_beer(&mut *tx, fields.beer).await?;
    if tx.user(owner).await?.is_none() {
        return Err(ApiError::not_found("no such user"));
    }
    ensure_picture(&mut *tx, fields.picture).await?;

    let bottle = fields.into_bottle(Uuid::new_v4(), owner);
    consistency::attach_bottle(&mut *tx, &bottle).await?;
    let view = bottle_view(&mut *tx, &bottle).await?;
    tx.commit().await?;

    info!(bottle = %bottle.id, user = %owner, beer = %bottle.beer, "added bottle");
    Ok(view)
}

pub async fn update_bottle(
    store: &dyn Store,
    id: Uuid,
    caller: Uuid,
    input: BottleInput,
) -> Result<BottleView, ApiError> {
    let mut tx = store.begin().await?;
    let Some(existing) = tx.bottle(id).await? else {
        return Err(ApiError::not_found("no such bottle"));
    };
    if existing.user != caller {
        warn!(bottle = %id, caller = %caller, "refused bottle update");
        return Err(ApiError::forbidden("no authorization to update bottle"));
    }

    let fields = validate_bottle(input)?;
    ensure_beer(&mut *tx, fields.beer).await?;
    ensure_picture(&mut *tx, fields.picture).await?;

    let bottle = fields.into_bottle(existing.id, existing.user);
    if !tx.replace_bottle(&bottle).await? {
        return Err(ApiError::not_found("no such bottle"));
    }
    let view = bottle_view(&mut *tx, &bottle).await?;
    tx.commit().await?;

    info!(bottle = %id, "updated bottle");
    Ok(view)
}

pub async fn delete_bottle(store: &dyn Store, id: Uuid, caller: Uuid) -> Result<(), ApiError> {
    let mut tx = store.begin().await?;
    let Some(existing) = tx.bottle(id).await? else {
        return Err(ApiError::not_found("no such bottle"));
    };
    if existing.user != caller {
        warn!(bottle = %id, caller = %caller, "refused bottle deletion");
        return Err(ApiError::forbidden("no authorization to delete bottle"));
    }

    let stashes = consistency::detach_bottle(&mut *tx, id).await?;
    tx.commit().await?;

    info!(bottle = %id, stashes, "deleted bottle");
    Ok(())
}

pub async fn list_bottles(store: &dyn Store) -> Result<Vec<BottleView>, ApiError> {
    let mut tx = store.begin().await?;
    let bottles = tx.bottles().await?;
    let joins = catalog_joins(&mut *tx).await?.with_users(tx.users().await?);
    Ok(bottles.iter().map(|b| joins.bottle_view(b)).collect())
}

pub async fn add_rating(store: &dyn Store, author: Uuid, input: RatingInput) -> Result<RatingView, ApiError> {
    let mut errors = FieldErrors::new("Rating");

    let beer = errors.id("beer", input.beer_id);
    let beer = errors.required("beer", beer);
    let mut score = |field: &str, raw: Raw, max: f64| {
        let value = errors.number(field, raw);
        let value = errors.required(field, value);
        if let Some(value) = value {
            errors.range(field, value, 0.0, max);
        }
        value
    };
    let aroma = score("aroma", input.aroma, rating::AROMA_MAX);
    let taste = score("taste", input.taste, rating::TASTE_MAX);
    let mouthfeel = score("mouthfeel", input.mouthfeel, rating::MOUTHFEEL_MAX);
    let appearance = score("appearance", input.appearance, rating::APPEARANCE_MAX);
    let overall = score("overall", input.overall, rating::OVERALL_MAX);
    let description = errors.text("description", input.description);
    if let Some(description) = &description {
        errors.max_length("description", description, rating::DESCRIPTION_MAX);
    }
    let age_of_beer = errors.number("ageOfBeer", input.age_of_beer);
    if let Some(age) = age_of_beer {
        errors.range("ageOfBeer", age, 0.0, rating::AGE_OF_BEER_MAX);
    }
    let picture = errors.id("picture", input.picture_id);
    errors.into_result()?;

    let (Some(beer), Some(aroma), Some(taste), Some(mouthfeel), Some(appearance), Some(overall)) =
        (beer, aroma, taste, mouthfeel, appearance, overall)
    else {
        return Err(ApiError::internal_server_error("validated rating fields missing"));
    };

    let mut tx = store.begin().await?;
    ensure_beer(&mut *tx, beer).await?;
    let Some(user) = tx.user(author).await? else {
        return Err(ApiError::not_found("no such user"));
    };
    ensure_picture(&mut *tx, picture).await?;

    let rating = Rating {
        id: Uuid::new_v4(),
        aroma,
        taste,
        mouthfeel,
        appearance,
        overall,
        description,
        age_of_beer,
        added: Utc::now(),
        beer,
        user: author,
        picture,
    };
    consistency::attach_rating(&mut *tx, &rating).await?;
    let view = catalog_joins(&mut *tx).await?.with_users([user]).rating_view(&rating);
    tx.commit().await?;

    info!(rating = %rating.id, user = %author, beer = %beer, "added rating");
    Ok(view)
}

pub async fn list_ratings(store: &dyn Store) -> Result<Vec<RatingView>, ApiError> {
    let mut tx = store.begin().await?;
    let ratings = tx.ratings().await?;
    let joins = catalog_joins(&mut *tx).await?.with_users(tx.users().await?);
    Ok(ratings.iter().map(|r| joins.rating_view(r)).collect())
}

pub async fn add_picture(store: &dyn Store, owner: Uuid, upload: Upload) -> Result<PictureView, ApiError> {
    let mut errors = FieldErrors::new("Picture");
    if upload.content.is_empty() {
        errors.push("content", "`content` is required");
    }
    if !Picture::is_image_type(&upload.content_type) {
        errors.push(
            "contentType",
            format!("`contentType` (`{}`) is not an image type", upload.content_type),
        );
    }
    let size = i64::try_from(upload.content.len()).unwrap_or(i64::MAX);
    errors.range("size", size, 0, picture::SIZE_MAX);
    errors.into_result()?;

    let mut tx = store.begin().await?;
    if tx.user(owner).await?.is_none() {
        return Err(ApiError::not_found("no such user"));
    }

    let picture = Picture {
        id: Uuid::new_v4(),
        filename: upload.filename.filter(|f| !f.trim().is_empty()),
        content: upload.content,
        content_type: upload.content_type,
        size,
        user: owner,
    };
    tx.insert_picture(&picture).await?;
    tx.commit().await?;

    info!(picture = %picture.id, user = %owner, size, "stored picture");
    Ok(PictureView::from(&picture))
}

pub async fn list_pictures(store: &dyn Store) -> Result<Vec<PictureView>, ApiError> {
    let mut tx = store.begin().await?;
    Ok(tx.pictures().await?.iter().map(PictureView::from).collect())
}

pub async fn get_picture(store: &dyn Store, id: Uuid) -> Result<Option<Picture>, ApiError> {
    let mut tx = store.begin().await?;
    Ok(tx.picture(id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Beer, Brewery, User};
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn seeded() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let brewery = Brewery::new("Westvleteren".to_string());
        let beer = Beer::new(brewery.id, "XII".to_string(), 12.2);
        let user = User {
            id: Uuid::new_v4(),
            username: "Somero".to_string(),
            password_hash: "hash".to_string(),
            name: "Miika".to_string(),
            email: None,
            hidden: false,
            country: None,
            city: None,
            picture: None,
            stash: Vec::new(),
            ratings: Vec::new(),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_brewery(&brewery).await.unwrap();
        consistency::attach_beer(&mut *tx, &beer).await.unwrap();
        tx.insert_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        (store, user.id, beer.id)
    }

    fn bottle_of(beer: Uuid) -> BottleInput {
        BottleInput {
            beer_id: Some(json!(beer)),
            count: Some(json!(2)),
            volume: Some(json!(0.33)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn bottle_violations_are_reported_together() {
        let (store, user, _) = seeded().await;
        let input = BottleInput {
            count: Some(json!(-1)),
            volume: Some(json!(11.0)),
            price: Some(json!(501.0)),
            ..Default::default()
        };

        let err = add_bottle(&store, user, input).await.unwrap_err();
        let message = err.message();
        assert!(message.contains("`beer` is required"));
        assert!(message.contains("`count` (-1) is less than minimum allowed value (0)"));
        assert!(message.contains("`volume` (11) is more than maximum allowed value (10)"));
        assert!(message.contains("`price` (501) is more than maximum allowed value (500)"));
    }

    #[tokio::test]
    async fn mistyped_bottle_fields_are_reported_with_the_rest() {
        let (store, user, beer) = seeded().await;
        let input = BottleInput {
            beer_id: Some(json!(beer)),
            count: Some(json!("two")),
            volume: Some(json!(11)),
            price: Some(json!(501)),
            bottled: Some(json!("yesterday")),
            ..Default::default()
        };

        let err = add_bottle(&store, user, input).await.unwrap_err();
        let message = err.message();
        assert!(message.contains("`count` (`two`) is not a number"));
        assert!(message.contains("`volume` (11) is more than maximum allowed value (10)"));
        assert!(message.contains("`price` (501) is more than maximum allowed value (500)"));
        assert!(message.contains("`bottled` (`yesterday`) is not a valid date"));
        assert!(!message.contains("`count` is required"));
    }

    #[tokio::test]
    async fn bottle_date_outside_window_is_rejected() {
        let (store, user, beer) = seeded().await;
        let mut input = bottle_of(beer);
        input.expiration = Some(json!("2052-05-22T00:00:00Z"));

        let err = add_bottle(&store, user, input).await.unwrap_err();
        assert!(err.message().contains("`expiration`"));
        assert!(err.message().contains("is after maximum allowed value"));
    }

    #[tokio::test]
    async fn bottle_for_unknown_beer_is_not_found() {
        let (store, user, _) = seeded().await;
        let err = add_bottle(&store, user, bottle_of(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(err.message(), "no such beer");
        assert!(list_bottles(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_caller_cannot_touch_bottle() {
        let (store, user, beer) = seeded().await;
        let bottle = add_bottle(&store, user, bottle_of(beer)).await.unwrap();
        let stranger = Uuid::new_v4();

        let mut update = bottle_of(beer);
        update.count = Some(json!(5));
        let err = update_bottle(&store, bottle.id, stranger, update).await.unwrap_err();
        assert_eq!(err.message(), "no authorization to update bottle");
        let err = delete_bottle(&store, bottle.id, stranger).await.unwrap_err();
        assert_eq!(err.message(), "no authorization to delete bottle");

        let bottles = list_bottles(&store).await.unwrap();
        assert_eq!(bottles.len(), 1);
        assert_eq!(bottles[0].count, 2);
    }

    #[tokio::test]
    async fn rating_scores_are_range_checked() {
        let (store, user, beer) = seeded().await;
        let input = RatingInput {
            beer_id: Some(json!(beer)),
            aroma: Some(json!(11)),
            taste: Some(json!(5)),
            mouthfeel: Some(json!(6)),
            appearance: Some(json!(3)),
            age_of_beer: Some(json!(400)),
            ..Default::default()
        };

        let err = add_rating(&store, user, input).await.unwrap_err();
        let message = err.message();
        assert!(message.contains("`aroma` (11) is more than maximum allowed value (10)"));
        assert!(message.contains("`mouthfeel` (6) is more than maximum allowed value (5)"));
        assert!(message.contains("`overall` is required"));
        assert!(message.contains("`ageOfBeer` (400) is more than maximum allowed value (360)"));
    }

    #[tokio::test]
    async fn rating_view_names_author_and_beer() {
        let (store, user, beer) = seeded().await;
        let input = RatingInput {
            beer_id: Some(json!(beer)),
            aroma: Some(json!(7.5)),
            taste: Some(json!(9)),
            mouthfeel: Some(json!(4)),
            appearance: Some(json!(5)),
            overall: Some(json!(18)),
            ..Default::default()
        };

        let view = add_rating(&store, user, input).await.unwrap();
        assert_eq!(view.aroma, 7.5);
        assert_eq!(view.user.unwrap().name, "Miika");
        let beer = view.beer.unwrap();
        assert_eq!(beer.abv, 12.2);
        assert_eq!(beer.brewery.unwrap().name, "Westvleteren");
    }

    #[tokio::test]
    async fn picture_must_be_an_image() {
        let (store, user, _) = seeded().await;
        let upload = Upload {
            filename: Some("notes.txt".to_string()),
            content_type: "text/plain".to_string(),
            content: b"not a picture".to_vec(),
        };

        let err = add_picture(&store, user, upload).await.unwrap_err();
        assert!(err.message().contains("`contentType` (`text/plain`) is not an image type"));
        assert!(list_pictures(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn picture_round_trips_content() {
        let (store, user, _) = seeded().await;
        let upload = Upload {
            filename: Some("label.png".to_string()),
            content_type: "image/png".to_string(),
            content: vec![0x89, b'P', b'N', b'G'],
        };

        let view = add_picture(&store, user, upload).await.unwrap();
        assert_eq!(view.size, 4);

        let stored = get_picture(&store, view.id).await.unwrap().unwrap();
        assert_eq!(stored.content, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(stored.content_type, "image/png");
    }
}
