use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Beer {
    pub id: Uuid,
    pub brewery: Uuid,
    pub name: String,
    pub abv: f64,
    pub ratings: Vec<Uuid>,
}

impl Beer {
    pub fn new(brewery: Uuid, name: String, abv: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            brewery,
            name,
            abv,
            ratings: Vec::new(),
        }
    }

    /// (brewery, name, abv) identifies a beer uniquely.
    pub fn same_key(&self, brewery: Uuid, name: &str, abv: f64) -> bool {
        self.brewery == brewery && self.name == name && self.abv == abv
    }
}
