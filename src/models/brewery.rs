use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Brewery {
    pub id: Uuid,
    pub name: String,
    pub beers: Vec<Uuid>,
}

impl Brewery {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            beers: Vec::new(),
        }
    }
}
