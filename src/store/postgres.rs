use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::config::DatabaseConfig;
use crate::models::{Beer, Bottle, Brewery, Picture, Rating, User};

/// Collections are tables of documents; back-references are `uuid[]`
/// columns edited with `array_append` / `array_remove`. `seq` only keeps
/// listings in insertion order.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        username TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT,
        hidden BOOLEAN NOT NULL DEFAULT FALSE,
        country TEXT,
        city TEXT,
        picture UUID,
        stash UUID[] NOT NULL DEFAULT '{}',
        ratings UUID[] NOT NULL DEFAULT '{}',
        CONSTRAINT users_username_key UNIQUE (username),
        CONSTRAINT users_email_key UNIQUE (email)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS breweries (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        beers UUID[] NOT NULL DEFAULT '{}',
        CONSTRAINT breweries_name_key UNIQUE (name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS beers (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        brewery UUID NOT NULL,
        name TEXT NOT NULL,
        abv DOUBLE PRECISION NOT NULL CHECK (abv >= 0),
        ratings UUID[] NOT NULL DEFAULT '{}',
        CONSTRAINT beers_brewery_name_abv_key UNIQUE (brewery, name, abv)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS bottles (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        count INTEGER NOT NULL,
        volume DOUBLE PRECISION NOT NULL,
        price DOUBLE PRECISION,
        bottled TIMESTAMPTZ,
        expiration TIMESTAMPTZ,
        added TIMESTAMPTZ,
        beer UUID NOT NULL,
        "user" UUID NOT NULL,
        picture UUID
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ratings (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        aroma DOUBLE PRECISION NOT NULL,
        taste DOUBLE PRECISION NOT NULL,
        mouthfeel DOUBLE PRECISION NOT NULL,
        appearance DOUBLE PRECISION NOT NULL,
        overall DOUBLE PRECISION NOT NULL,
        description TEXT,
        age_of_beer DOUBLE PRECISION,
        added TIMESTAMPTZ NOT NULL,
        beer UUID NOT NULL,
        "user" UUID NOT NULL,
        picture UUID
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pictures (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        filename TEXT,
        content BYTEA NOT NULL,
        content_type TEXT NOT NULL,
        size BIGINT NOT NULL,
        "user" UUID NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS bottles_user_idx ON bottles ("user")"#,
    r#"CREATE INDEX IF NOT EXISTS ratings_user_idx ON ratings ("user")"#,
    r#"CREATE INDEX IF NOT EXISTS pictures_user_idx ON pictures ("user")"#,
    // Widens score columns of databases created with whole-number scores.
    r#"ALTER TABLE ratings
        ALTER COLUMN aroma TYPE DOUBLE PRECISION,
        ALTER COLUMN taste TYPE DOUBLE PRECISION,
        ALTER COLUMN mouthfeel TYPE DOUBLE PRECISION,
        ALTER COLUMN appearance TYPE DOUBLE PRECISION,
        ALTER COLUMN overall TYPE DOUBLE PRECISION,
        ALTER COLUMN age_of_beer TYPE DOUBLE PRECISION"#,
];

const USER_COLUMNS: &str =
    "id, username, password_hash, name, email, hidden, country, city, picture, stash, ratings";
const BREWERY_COLUMNS: &str = "id, name, beers";
const BEER_COLUMNS: &str = "id, brewery, name, abv, ratings";
const BOTTLE_COLUMNS: &str =
    r#"id, count, volume, price, bottled, expiration, added, beer, "user", picture"#;
const RATING_COLUMNS: &str = r#"id, aroma, taste, mouthfeel, appearance, overall, description, age_of_beer, added, beer, "user", picture"#;
const PICTURE_COLUMNS: &str = r#"id, filename, content, content_type, size, "user""#;

/// PostgreSQL backend; one transaction per unit of work.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, settings: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", redact_url(url));
        Ok(Self { pool })
    }

    /// Creates missing tables and indexes.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

/// Drops credentials from a connection string before it is logged.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn users(&mut self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY seq", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&mut *self.tx).await?)
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, name, email, hidden, country, city, picture, stash, ratings)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.hidden)
        .bind(&user.country)
        .bind(&user.city)
        .bind(user.picture)
        .bind(&user.stash)
        .bind(&user.ratings)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_user_profile(&mut self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = $2, name = $3, email = $4, hidden = $5, country = $6, city = $7, picture = $8
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.hidden)
        .bind(&user.country)
        .bind(&user.city)
        .bind(user.picture)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_stash(&mut self, user: Uuid, bottle: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET stash = array_append(stash, $2) WHERE id = $1")
            .bind(user)
            .bind(bottle)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_from_stashes(&mut self, bottle: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE users SET stash = array_remove(stash, $1) WHERE $1 = ANY(stash)")
            .bind(bottle)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn push_user_rating(&mut self, user: Uuid, rating: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET ratings = array_append(ratings, $2) WHERE id = $1")
            .bind(user)
            .bind(rating)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn breweries(&mut self) -> StoreResult<Vec<Brewery>> {
        let sql = format!("SELECT {} FROM breweries ORDER BY seq", BREWERY_COLUMNS);
        Ok(sqlx::query_as::<_, Brewery>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn brewery(&mut self, id: Uuid) -> StoreResult<Option<Brewery>> {
        let sql = format!("SELECT {} FROM breweries WHERE id = $1", BREWERY_COLUMNS);
        Ok(sqlx::query_as::<_, Brewery>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn brewery_by_name(&mut self, name: &str) -> StoreResult<Option<Brewery>> {
        let sql = format!("SELECT {} FROM breweries WHERE name = $1", BREWERY_COLUMNS);
        Ok(sqlx::query_as::<_, Brewery>(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_brewery(&mut self, brewery: &Brewery) -> StoreResult<()> {
        sqlx::query("INSERT INTO breweries (id, name, beers) VALUES ($1, $2, $3)")
            .bind(brewery.id)
            .bind(&brewery.name)
            .bind(&brewery.beers)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn push_brewery_beer(&mut self, brewery: Uuid, beer: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE breweries SET beers = array_append(beers, $2) WHERE id = $1")
            .bind(brewery)
            .bind(beer)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn beers(&mut self) -> StoreResult<Vec<Beer>> {
        let sql = format!("SELECT {} FROM beers ORDER BY seq", BEER_COLUMNS);
        Ok(sqlx::query_as::<_, Beer>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn beer(&mut self, id: Uuid) -> StoreResult<Option<Beer>> {
        let sql = format!("SELECT {} FROM beers WHERE id = $1", BEER_COLUMNS);
        Ok(sqlx::query_as::<_, Beer>(&sql).bind(id).fetch_optional(&mut *self.tx).await?)
    }

    async fn beer_by_key(&mut self, brewery: Uuid, name: &str, abv: f64) -> StoreResult<Option<Beer>> {
        let sql = format!(
            "SELECT {} FROM beers WHERE brewery = $1 AND name = $2 AND abv = $3",
            BEER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Beer>(&sql)
            .bind(brewery)
            .bind(name)
            .bind(abv)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_beer(&mut self, beer: &Beer) -> StoreResult<()> {
        sqlx::query("INSERT INTO beers (id, brewery, name, abv, ratings) VALUES ($1, $2, $3, $4, $5)")
            .bind(beer.id)
            .bind(beer.brewery)
            .bind(&beer.name)
            .bind(beer.abv)
            .bind(&beer.ratings)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn push_beer_rating(&mut self, beer: Uuid, rating: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE beers SET ratings = array_append(ratings, $2) WHERE id = $1")
            .bind(beer)
            .bind(rating)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_beer_ratings(&mut self, ratings: &[Uuid]) -> StoreResult<u64> {
        if ratings.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE beers
             SET ratings = ARRAY(SELECT r FROM unnest(ratings) AS r WHERE r <> ALL($1))
             WHERE ratings && $1",
        )
        .bind(ratings.to_vec())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn bottles(&mut self) -> StoreResult<Vec<Bottle>> {
        let sql = format!("SELECT {} FROM bottles ORDER BY seq", BOTTLE_COLUMNS);
        Ok(sqlx::query_as::<_, Bottle>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn bottle(&mut self, id: Uuid) -> StoreResult<Option<Bottle>> {
        let sql = format!("SELECT {} FROM bottles WHERE id = $1", BOTTLE_COLUMNS);
        Ok(sqlx::query_as::<_, Bottle>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_bottle(&mut self, bottle: &Bottle) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO bottles (id, count, volume, price, bottled, expiration, added, beer, "user", picture)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(bottle.id)
        .bind(bottle.count)
        .bind(bottle.volume)
        .bind(bottle.price)
        .bind(bottle.bottled)
        .bind(bottle.expiration)
        .bind(bottle.added)
        .bind(bottle.beer)
        .bind(bottle.user)
        .bind(bottle.picture)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn replace_bottle(&mut self, bottle: &Bottle) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"UPDATE bottles
               SET count = $2, volume = $3, price = $4, bottled = $5, expiration = $6, added = $7,
                   beer = $8, "user" = $9, picture = $10
               WHERE id = $1"#,
        )
        .bind(bottle.id)
        .bind(bottle.count)
        .bind(bottle.volume)
        .bind(bottle.price)
        .bind(bottle.bottled)
        .bind(bottle.expiration)
        .bind(bottle.added)
        .bind(bottle.beer)
        .bind(bottle.user)
        .bind(bottle.picture)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_bottle(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bottles WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_bottles_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(r#"DELETE FROM bottles WHERE "user" = $1 RETURNING id"#)
            .bind(user)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn ratings(&mut self) -> StoreResult<Vec<Rating>> {
        let sql = format!("SELECT {} FROM ratings ORDER BY seq", RATING_COLUMNS);
        Ok(sqlx::query_as::<_, Rating>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO ratings (id, aroma, taste, mouthfeel, appearance, overall, description, age_of_beer, added, beer, "user", picture)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(rating.id)
        .bind(rating.aroma)
        .bind(rating.taste)
        .bind(rating.mouthfeel)
        .bind(rating.appearance)
        .bind(rating.overall)
        .bind(&rating.description)
        .bind(rating.age_of_beer)
        .bind(rating.added)
        .bind(rating.beer)
        .bind(rating.user)
        .bind(rating.picture)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_ratings_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(r#"DELETE FROM ratings WHERE "user" = $1 RETURNING id"#)
            .bind(user)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn pictures(&mut self) -> StoreResult<Vec<Picture>> {
        let sql = format!("SELECT {} FROM pictures ORDER BY seq", PICTURE_COLUMNS);
        Ok(sqlx::query_as::<_, Picture>(&sql).fetch_all(&mut *self.tx).await?)
    }

    async fn picture(&mut self, id: Uuid) -> StoreResult<Option<Picture>> {
        let sql = format!("SELECT {} FROM pictures WHERE id = $1", PICTURE_COLUMNS);
        Ok(sqlx::query_as::<_, Picture>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_picture(&mut self, picture: &Picture) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO pictures (id, filename, content, content_type, size, "user")
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(picture.id)
        .bind(&picture.filename)
        .bind(&picture.content)
        .bind(&picture.content_type)
        .bind(picture.size)
        .bind(picture.user)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_pictures_of(&mut self, user: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(r#"DELETE FROM pictures WHERE "user" = $1"#)
            .bind(user)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
