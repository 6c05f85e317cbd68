//! Document store used by the services.
//!
//! Every request works through a [`UnitOfWork`]: reads see the unit's own
//! writes, and nothing becomes visible to other units until `commit`.
//! Dropping a unit without committing discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Beer, Bottle, Brewery, Picture, Rating, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.constraint().unwrap_or("unknown").to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend name for logs and the health endpoint.
    fn kind(&self) -> &'static str;
}

/// Collection operations available inside a unit of work.
///
/// `push_*` and `pull_*` edit back-reference lists in place, so they never
/// overwrite concurrent edits to the rest of the document. Methods that
/// target one document by id return whether it matched.
#[async_trait]
pub trait UnitOfWork: Send {
    // users
    async fn users(&mut self) -> StoreResult<Vec<User>>;
    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;
    /// Replaces profile fields; `stash` and `ratings` are left untouched.
    async fn update_user_profile(&mut self, user: &User) -> StoreResult<bool>;
    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool>;
    async fn push_stash(&mut self, user: Uuid, bottle: Uuid) -> StoreResult<bool>;
    /// Removes the bottle from every stash that lists it.
    async fn pull_from_stashes(&mut self, bottle: Uuid) -> StoreResult<u64>;
    async fn push_user_rating(&mut self, user: Uuid, rating: Uuid) -> StoreResult<bool>;

    // breweries
    async fn breweries(&mut self) -> StoreResult<Vec<Brewery>>;
    async fn brewery(&mut self, id: Uuid) -> StoreResult<Option<Brewery>>;
    async fn brewery_by_name(&mut self, name: &str) -> StoreResult<Option<Brewery>>;
    async fn insert_brewery(&mut self, brewery: &Brewery) -> StoreResult<()>;
    async fn push_brewery_beer(&mut self, brewery: Uuid, beer: Uuid) -> StoreResult<bool>;

    // beers
    async fn beers(&mut self) -> StoreResult<Vec<Beer>>;
    async fn beer(&mut self, id: Uuid) -> StoreResult<Option<Beer>>;
    async fn beer_by_key(&mut self, brewery: Uuid, name: &str, abv: f64) -> StoreResult<Option<Beer>>;
    async fn insert_beer(&mut self, beer: &Beer) -> StoreResult<()>;
    async fn push_beer_rating(&mut self, beer: Uuid, rating: Uuid) -> StoreResult<bool>;
    /// Removes the given ratings from every beer; returns beers touched.
    async fn pull_beer_ratings(&mut self, ratings: &[Uuid]) -> StoreResult<u64>;

    // bottles
    async fn bottles(&mut self) -> StoreResult<Vec<Bottle>>;
    async fn bottle(&mut self, id: Uuid) -> StoreResult<Option<Bottle>>;
    async fn insert_bottle(&mut self, bottle: &Bottle) -> StoreResult<()>;
    async fn replace_bottle(&mut self, bottle: &Bottle) -> StoreResult<bool>;
    async fn delete_bottle(&mut self, id: Uuid) -> StoreResult<bool>;
    /// Returns the ids of the removed bottles.
    async fn delete_bottles_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>>;

    // ratings
    async fn ratings(&mut self) -> StoreResult<Vec<Rating>>;
    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()>;
    /// Returns the ids of the removed ratings.
    async fn delete_ratings_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>>;

    // pictures
    async fn pictures(&mut self) -> StoreResult<Vec<Picture>>;
    async fn picture(&mut self, id: Uuid) -> StoreResult<Option<Picture>>;
    async fn insert_picture(&mut self, picture: &Picture) -> StoreResult<()>;
    async fn delete_pictures_of(&mut self, user: Uuid) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
