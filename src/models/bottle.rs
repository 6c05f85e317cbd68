use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const COUNT_MAX: i32 = 50;
pub const VOLUME_MAX: f64 = 10.0;
pub const PRICE_MAX: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Bottle {
    pub id: Uuid,
    pub count: i32,
    /// Liters
    pub volume: f64,
    pub price: Option<f64>,
    pub bottled: Option<DateTime<Utc>>,
    pub expiration: Option<DateTime<Utc>>,
    pub added: Option<DateTime<Utc>>,
    pub beer: Uuid,
    pub user: Uuid,
    pub picture: Option<Uuid>,
}
