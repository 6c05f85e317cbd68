use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const AROMA_MAX: f64 = 10.0;
pub const TASTE_MAX: f64 = 10.0;
pub const MOUTHFEEL_MAX: f64 = 5.0;
pub const APPEARANCE_MAX: f64 = 5.0;
pub const OVERALL_MAX: f64 = 20.0;
pub const AGE_OF_BEER_MAX: f64 = 360.0;
pub const DESCRIPTION_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub aroma: f64,
    pub taste: f64,
    pub mouthfeel: f64,
    pub appearance: f64,
    pub overall: f64,
    pub description: Option<String>,
    /// Days since bottling at the time of tasting
    pub age_of_beer: Option<f64>,
    pub added: DateTime<Utc>,
    pub beer: Uuid,
    pub user: Uuid,
    pub picture: Option<Uuid>,
}
