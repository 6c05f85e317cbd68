//! Users and credentials.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::views::{Joins, UserView};
use crate::auth::{self, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::models::user::{PASSWORD_MAX, PASSWORD_MIN, USERNAME_MAX, USERNAME_MIN};
use crate::models::{FieldErrors, Raw, User};
use crate::store::{Store, UnitOfWork};

use super::ensure_picture;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewUser {
    pub username: Raw,
    pub password: Raw,
    pub name: Raw,
    pub email: Raw,
    pub hidden: Raw,
    pub country: Raw,
    pub city: Raw,
}

/// Full replacement of the profile. The username cannot change; a missing
/// password keeps the current one.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Raw,
    pub email: Raw,
    pub hidden: Raw,
    pub country: Raw,
    pub city: Raw,
    #[serde(alias = "picture")]
    pub picture_id: Raw,
    pub password: Raw,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub name: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Rejects an email that another user already holds.
async fn check_email(
    tx: &mut dyn UnitOfWork,
    errors: &mut FieldErrors,
    email: Option<&str>,
    owner: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(email) = email {
        if let Some(holder) = tx.user_by_email(email).await? {
            if Some(holder.id) != owner {
                errors.unique("email");
            }
        }
    }
    Ok(())
}

async fn user_view(tx: &mut dyn UnitOfWork, user: &User) -> Result<UserView, ApiError> {
    let mut bottles = Vec::with_capacity(user.stash.len());
    for id in &user.stash {
        if let Some(bottle) = tx.bottle(*id).await? {
            bottles.push(bottle);
        }
    }
    Ok(Joins::new().with_bottles(bottles).user_view(user))
}

pub async fn register(store: &dyn Store, security: &SecurityConfig, input: NewUser) -> Result<UserView, ApiError> {
    let mut errors = FieldErrors::new("User");

    let username = errors.text("username", input.username);
    let username = errors.required_text("username", username);
    if let Some(username) = &username {
        errors.length("username", username, USERNAME_MIN, USERNAME_MAX);
    }
    let password = errors.secret("password", input.password);
    let password = errors.required_text("password", password);
    if let Some(password) = &password {
        errors.secret_length("password", password, PASSWORD_MIN, PASSWORD_MAX);
    }
    let name = errors.text("name", input.name);
    let name = errors.required_text("name", name);
    let email = non_blank(errors.text("email", input.email));
    let hidden = errors.flag("hidden", input.hidden);
    let country = non_blank(errors.text("country", input.country));
    let city = non_blank(errors.text("city", input.city));

    // Hash outside the unit of work; a memory unit holds the store lock.
    let password_hash = match password {
        Some(password) if errors.is_empty() => Some(auth::hash_password(password, security.bcrypt_cost).await?),
        _ => None,
    };

    let mut tx = store.begin().await?;
    if let Some(username) = &username {
        if !errors.has("username") && tx.user_by_username(username).await?.is_some() {
            errors.unique("username");
        }
    }
    check_email(&mut *tx, &mut errors, email.as_deref(), None).await?;
    errors.into_result()?;

    let (Some(username), Some(password_hash), Some(name)) = (username, password_hash, name) else {
        return Err(ApiError::internal_server_error("validated user fields missing"));
    };

    let user = User {
        id: Uuid::new_v4(),
        username,
        password_hash,
        name,
        email,
        hidden: hidden.unwrap_or(false),
        country,
        city,
        picture: None,
        stash: Vec::new(),
        ratings: Vec::new(),
    };
    tx.insert_user(&user).await?;
    tx.commit().await?;

    info!(user = %user.id, username = %user.username, "registered user");
    Ok(Joins::new().user_view(&user))
}

/// Unknown user, wrong password and absent credentials all answer the
/// same way.
pub async fn authenticate(
    store: &dyn Store,
    security: &SecurityConfig,
    credentials: Option<Credentials>,
) -> Result<LoginResponse, ApiError> {
    let credentials = credentials.unwrap_or_default();
    let (Some(username), Some(password)) = (non_blank(credentials.username), non_blank(credentials.password)) else {
        return Err(ApiError::InvalidCredentials);
    };

    let mut tx = store.begin().await?;
    let user = tx.user_by_username(&username).await?;
    drop(tx);

    let verified = match &user {
        Some(user) => auth::verify_password(password, user.password_hash.clone()).await,
        None => false,
    };
    let (Some(user), true) = (user, verified) else {
        warn!(username = %username, "rejected login");
        return Err(ApiError::InvalidCredentials);
    };

    let claims = Claims::new(user.id, user.username.clone(), security.jwt_expiry_hours)?;
    let token = auth::generate_jwt(&claims, security)?;

    info!(user = %user.id, "issued token");
    Ok(LoginResponse {
        token,
        username: user.username,
        name: user.name,
    })
}

pub async fn update_user(
    store: &dyn Store,
    security: &SecurityConfig,
    id: Uuid,
    caller: Uuid,
    input: UserUpdate,
) -> Result<UserView, ApiError> {
    let mut errors = FieldErrors::new("User");
    let name = errors.text("name", input.name);
    let name = errors.required_text("name", name);
    let password = non_blank(errors.secret("password", input.password));
    if let Some(password) = &password {
        errors.secret_length("password", password, PASSWORD_MIN, PASSWORD_MAX);
    }
    let email = non_blank(errors.text("email", input.email));
    let hidden = errors.flag("hidden", input.hidden);
    let country = non_blank(errors.text("country", input.country));
    let city = non_blank(errors.text("city", input.city));
    let picture = errors.id("picture", input.picture_id);

    // Only the owner's own valid request gets as far as hashing.
    let password_hash = match password {
        Some(password) if id == caller && errors.is_empty() => {
            Some(auth::hash_password(password, security.bcrypt_cost).await?)
        }
        _ => None,
    };

    let mut tx = store.begin().await?;
    let Some(mut user) = tx.user(id).await? else {
        return Err(ApiError::not_found("no such user"));
    };
    if user.id != caller {
        warn!(user = %id, caller = %caller, "refused user update");
        return Err(ApiError::forbidden("no authorization to update user"));
    }

    check_email(&mut *tx, &mut errors, email.as_deref(), Some(user.id)).await?;
    errors.into_result()?;
    ensure_picture(&mut *tx, picture).await?;

    if let Some(name) = name {
        user.name = name;
    }
    if let Some(password_hash) = password_hash {
        user.password_hash = password_hash;
    }
    user.email = email;
    user.hidden = hidden.unwrap_or(false);
    user.country = country;
    user.city = city;
    user.picture = picture;

    if !tx.update_user_profile(&user).await? {
        return Err(ApiError::not_found("no such user"));
    }
    let view = user_view(&mut *tx, &user).await?;
    tx.commit().await?;

    info!(user = %user.id, "updated user");
    Ok(view)
}

pub async fn remove_user(store: &dyn Store, id: Uuid, caller: Uuid) -> Result<(), ApiError> {
    let mut tx = store.begin().await?;
    if tx.user(id).await?.is_none() {
        return Err(ApiError::not_found("no such user"));
    }
    if id != caller {
        warn!(user = %id, caller = %caller, "refused user deletion");
        return Err(ApiError::forbidden("no authorization to delete user"));
    }

    let cascade = super::consistency::cascade_user(&mut *tx, id).await?;
    tx.commit().await?;

    info!(
        user = %id,
        bottles = cascade.bottles,
        ratings = cascade.ratings,
        pictures = cascade.pictures,
        beers = cascade.beers_pruned,
        "deleted user"
    );
    Ok(())
}

pub async fn list_users(store: &dyn Store) -> Result<Vec<UserView>, ApiError> {
    let mut tx = store.begin().await?;
    let users = tx.users().await?;
    let joins = Joins::new().with_bottles(tx.bottles().await?);
    Ok(users.iter().map(|u| joins.user_view(u)).collect())
}

pub async fn find_user(store: &dyn Store, username: &str) -> Result<Option<UserView>, ApiError> {
    let mut tx = store.begin().await?;
    match tx.user_by_username(username).await? {
        Some(user) => Ok(Some(user_view(&mut *tx, &user).await?)),
        None => Ok(None),
    }
}
