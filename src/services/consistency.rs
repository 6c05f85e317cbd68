//! Back-reference bookkeeping.
//!
//! Each mutation that touches a denormalized list has one function here.
//! The primary write always comes first, then the back-references, all
//! inside the caller's unit of work. Nothing is visible until the caller
//! commits, so an error from any step leaves the store as it was.

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Beer, Bottle, Rating};
use crate::store::UnitOfWork;

/// What a user deletion removed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Cascade {
    pub bottles: usize,
    pub ratings: usize,
    pub pictures: u64,
    pub beers_pruned: u64,
}

pub async fn attach_beer(tx: &mut dyn UnitOfWork, beer: &Beer) -> Result<(), ApiError> {
    tx.insert_beer(beer).await?;
    if !tx.push_brewery_beer(beer.brewery, beer.id).await? {
        return Err(ApiError::not_found("no such brewery"));
    }
    Ok(())
}

pub async fn attach_bottle(tx: &mut dyn UnitOfWork, bottle: &Bottle) -> Result<(), ApiError> {
    tx.insert_bottle(bottle).await?;
    if !tx.push_stash(bottle.user, bottle.id).await? {
        return Err(ApiError::not_found("no such user"));
    }
    Ok(())
}

/// Removes the bottle and pulls it from every stash that lists it.
pub async fn detach_bottle(tx: &mut dyn UnitOfWork, bottle: Uuid) -> Result<u64, ApiError> {
    if !tx.delete_bottle(bottle).await? {
        return Err(ApiError::not_found("no such bottle"));
    }
    Ok(tx.pull_from_stashes(bottle).await?)
}

pub async fn attach_rating(tx: &mut dyn UnitOfWork, rating: &Rating) -> Result<(), ApiError> {
    tx.insert_rating(rating).await?;
    if !tx.push_user_rating(rating.user, rating.id).await? {
        return Err(ApiError::not_found("no such user"));
    }
    if !tx.push_beer_rating(rating.beer, rating.id).await? {
        return Err(ApiError::not_found("no such beer"));
    }
    Ok(())
}

pub async fn cascade_user(tx: &mut dyn UnitOfWork, user: Uuid) -> Result<Cascade, ApiError> {
    let bottles = tx.delete_bottles_of(user).await?;
    let ratings = tx.delete_ratings_of(user).await?;
    let pictures = tx.delete_pictures_of(user).await?;
    let beers_pruned = if ratings.is_empty() {
        0
    } else {
        tx.pull_beer_ratings(&ratings).await?
    };

    if !tx.delete_user(user).await? {
        return Err(ApiError::not_found("no such user"));
    }

    Ok(Cascade {
        bottles: bottles.len(),
        ratings: ratings.len(),
        pictures,
        beers_pruned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Brewery, Picture, User};
    use crate::store::{MemoryStore, Store};
    use chrono::Utc;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            name: username.to_string(),
            email: None,
            hidden: false,
            country: None,
            city: None,
            picture: None,
            stash: Vec::new(),
            ratings: Vec::new(),
        }
    }

    fn bottle(beer: Uuid, user: Uuid) -> Bottle {
        Bottle {
            id: Uuid::new_v4(),
            count: 1,
            volume: 0.33,
            price: None,
            bottled: None,
            expiration: None,
            added: None,
            beer,
            user,
            picture: None,
        }
    }

    fn rating(beer: Uuid, user: Uuid) -> Rating {
        Rating {
            id: Uuid::new_v4(),
            aroma: 5.0,
            taste: 5.0,
            mouthfeel: 3.0,
            appearance: 3.0,
            overall: 10.0,
            description: None,
            age_of_beer: None,
            added: Utc::now(),
            beer,
            user,
            picture: None,
        }
    }

    async fn seeded(store: &MemoryStore) -> (User, Beer) {
        let brewery = Brewery::new("Westvleteren".to_string());
        let beer = Beer::new(brewery.id, "XII".to_string(), 12.2);
        let owner = user("Somero");

        let mut tx = store.begin().await.unwrap();
        tx.insert_brewery(&brewery).await.unwrap();
        attach_beer(&mut *tx, &beer).await.unwrap();
        tx.insert_user(&owner).await.unwrap();
        tx.commit().await.unwrap();
        (owner, beer)
    }

    #[tokio::test]
    async fn beer_is_listed_by_its_brewery() {
        let store = MemoryStore::new();
        let (_, beer) = seeded(&store).await;

        let mut tx = store.begin().await.unwrap();
        let brewery = tx.brewery(beer.brewery).await.unwrap().unwrap();
        assert_eq!(brewery.beers, vec![beer.id]);
    }

    #[tokio::test]
    async fn rating_lands_on_author_and_beer() {
        let store = MemoryStore::new();
        let (owner, beer) = seeded(&store).await;
        let rating = rating(beer.id, owner.id);

        let mut tx = store.begin().await.unwrap();
        attach_rating(&mut *tx, &rating).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.user(owner.id).await.unwrap().unwrap().ratings, vec![rating.id]);
        assert_eq!(tx.beer(beer.id).await.unwrap().unwrap().ratings, vec![rating.id]);
    }

    #[tokio::test]
    async fn failed_back_reference_leaves_no_orphan() {
        let store = MemoryStore::new();
        let (_, beer) = seeded(&store).await;
        let stray = bottle(beer.id, Uuid::new_v4());

        let mut tx = store.begin().await.unwrap();
        let err = attach_bottle(&mut *tx, &stray).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.bottle(stray.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detached_bottle_leaves_every_stash() {
        let store = MemoryStore::new();
        let (owner, beer) = seeded(&store).await;
        let kept = bottle(beer.id, owner.id);
        let gone = bottle(beer.id, owner.id);

        let mut tx = store.begin().await.unwrap();
        attach_bottle(&mut *tx, &kept).await.unwrap();
        attach_bottle(&mut *tx, &gone).await.unwrap();
        assert_eq!(detach_bottle(&mut *tx, gone.id).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.user(owner.id).await.unwrap().unwrap().stash, vec![kept.id]);
    }

    #[tokio::test]
    async fn user_cascade_prunes_beer_ratings() {
        let store = MemoryStore::new();
        let (owner, beer) = seeded(&store).await;
        let other = user("Kalevi");
        let mine = rating(beer.id, owner.id);
        let theirs = rating(beer.id, other.id);
        let picture = Picture {
            id: Uuid::new_v4(),
            filename: None,
            content: vec![1, 2, 3],
            content_type: "image/png".to_string(),
            size: 3,
            user: owner.id,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&other).await.unwrap();
        attach_bottle(&mut *tx, &bottle(beer.id, owner.id)).await.unwrap();
        attach_rating(&mut *tx, &mine).await.unwrap();
        attach_rating(&mut *tx, &theirs).await.unwrap();
        tx.insert_picture(&picture).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let cascade = cascade_user(&mut *tx, owner.id).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(
            cascade,
            Cascade {
                bottles: 1,
                ratings: 1,
                pictures: 1,
                beers_pruned: 1
            }
        );

        let mut tx = store.begin().await.unwrap();
        assert!(tx.user(owner.id).await.unwrap().is_none());
        assert!(tx.bottles().await.unwrap().is_empty());
        assert!(tx.pictures().await.unwrap().is_empty());
        assert_eq!(tx.beer(beer.id).await.unwrap().unwrap().ratings, vec![theirs.id]);
    }
}
