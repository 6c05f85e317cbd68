use sqlx::FromRow;
use uuid::Uuid;

pub const USERNAME_MIN: usize = 5;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: Option<String>,
    pub hidden: bool,
    pub country: Option<String>,
    pub city: Option<String>,
    pub picture: Option<Uuid>,
    /// Bottles owned by this user, in acquisition order.
    pub stash: Vec<Uuid>,
    pub ratings: Vec<Uuid>,
}
