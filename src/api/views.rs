//! Public wire shapes with references resolved.
//!
//! A [`Joins`] holds the documents a response needs; the `*_view` methods
//! embed them. A reference whose target is missing renders as `null`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Beer, Bottle, Brewery, Picture, Rating, User};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreweryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BeerSummary {
    pub id: Uuid,
    pub name: String,
    pub abv: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreweryView {
    pub id: Uuid,
    pub name: String,
    pub beers: Vec<BeerSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BeerView {
    pub id: Uuid,
    pub name: String,
    pub abv: f64,
    pub brewery: Option<BreweryRef>,
    pub ratings: Vec<Uuid>,
}

/// Beer as embedded in bottles and ratings; ratings left out.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbeddedBeer {
    pub id: Uuid,
    pub name: String,
    pub abv: f64,
    pub brewery: Option<BreweryRef>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OwnerRef {
    pub id: Uuid,
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BottleView {
    pub id: Uuid,
    pub count: i32,
    pub volume: f64,
    pub price: Option<f64>,
    pub bottled: Option<DateTime<Utc>>,
    pub expiration: Option<DateTime<Utc>>,
    pub added: Option<DateTime<Utc>>,
    pub beer: Option<EmbeddedBeer>,
    pub user: Option<OwnerRef>,
    pub picture: Option<Uuid>,
}

/// Bottle as listed in a user's stash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StashEntry {
    pub id: Uuid,
    pub count: i32,
    pub volume: f64,
    pub price: Option<f64>,
    pub bottled: Option<DateTime<Utc>>,
    pub expiration: Option<DateTime<Utc>>,
    pub added: Option<DateTime<Utc>>,
    pub beer: Uuid,
    pub picture: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub id: Uuid,
    pub aroma: f64,
    pub taste: f64,
    pub mouthfeel: f64,
    pub appearance: f64,
    pub overall: f64,
    pub description: Option<String>,
    pub age_of_beer: Option<f64>,
    pub added: DateTime<Utc>,
    pub beer: Option<EmbeddedBeer>,
    pub user: Option<AuthorRef>,
    pub picture: Option<Uuid>,
}

/// Never carries the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub hidden: bool,
    pub country: Option<String>,
    pub city: Option<String>,
    pub picture: Option<Uuid>,
    pub stash: Vec<StashEntry>,
    pub ratings: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PictureView {
    pub id: Uuid,
    pub filename: Option<String>,
    pub content_type: String,
    pub size: i64,
    pub user: Uuid,
}

impl From<&Picture> for PictureView {
    fn from(picture: &Picture) -> Self {
        Self {
            id: picture.id,
            filename: picture.filename.clone(),
            content_type: picture.content_type.clone(),
            size: picture.size,
            user: picture.user,
        }
    }
}

#[derive(Debug, Default)]
pub struct Joins {
    breweries: HashMap<Uuid, Brewery>,
    beers: HashMap<Uuid, Beer>,
    users: HashMap<Uuid, User>,
    bottles: HashMap<Uuid, Bottle>,
}

impl Joins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breweries(mut self, breweries: impl IntoIterator<Item = Brewery>) -> Self {
        self.breweries.extend(breweries.into_iter().map(|b| (b.id, b)));
        self
    }

    pub fn with_beers(mut self, beers: impl IntoIterator<Item = Beer>) -> Self {
        self.beers.extend(beers.into_iter().map(|b| (b.id, b)));
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = User>) -> Self {
        self.users.extend(users.into_iter().map(|u| (u.id, u)));
        self
    }

    pub fn with_bottles(mut self, bottles: impl IntoIterator<Item = Bottle>) -> Self {
        self.bottles.extend(bottles.into_iter().map(|b| (b.id, b)));
        self
    }

    fn brewery_ref(&self, id: Uuid) -> Option<BreweryRef> {
        self.breweries.get(&id).map(|b| BreweryRef {
            id: b.id,
            name: b.name.clone(),
        })
    }

    fn embedded_beer(&self, id: Uuid) -> Option<EmbeddedBeer> {
        self.beers.get(&id).map(|beer| EmbeddedBeer {
            id: beer.id,
            name: beer.name.clone(),
            abv: beer.abv,
            brewery: self.brewery_ref(beer.brewery),
        })
    }

    pub fn brewery_view(&self, brewery: &Brewery) -> BreweryView {
        BreweryView {
            id: brewery.id,
            name: brewery.name.clone(),
            beers: brewery
                .beers
                .iter()
                .filter_map(|id| self.beers.get(id))
                .map(|beer| BeerSummary {
                    id: beer.id,
                    name: beer.name.clone(),
                    abv: beer.abv,
                })
                .collect(),
        }
    }

    pub fn beer_view(&self, beer: &Beer) -> BeerView {
        BeerView {
            id: beer.id,
            name: beer.name.clone(),
            abv: beer.abv,
            brewery: self.brewery_ref(beer.brewery),
            ratings: beer.ratings.clone(),
        }
    }

    pub fn bottle_view(&self, bottle: &Bottle) -> BottleView {
        BottleView {
            id: bottle.id,
            count: bottle.count,
            volume: bottle.volume,
            price: bottle.price,
            bottled: bottle.bottled,
            expiration: bottle.expiration,
            added: bottle.added,
            beer: self.embedded_beer(bottle.beer),
            user: self.users.get(&bottle.user).map(|u| OwnerRef {
                id: u.id,
                name: u.name.clone(),
                hidden: u.hidden,
            }),
            picture: bottle.picture,
        }
    }

    pub fn rating_view(&self, rating: &Rating) -> RatingView {
        RatingView {
            id: rating.id,
            aroma: rating.aroma,
            taste: rating.taste,
            mouthfeel: rating.mouthfeel,
            appearance: rating.appearance,
            overall: rating.overall,
            description: rating.description.clone(),
            age_of_beer: rating.age_of_beer,
            added: rating.added,
            beer: self.embedded_beer(rating.beer),
            user: self.users.get(&rating.user).map(|u| AuthorRef {
                id: u.id,
                name: u.name.clone(),
            }),
            picture: rating.picture,
        }
    }

    pub fn user_view(&self, user: &User) -> UserView {
        UserView {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            hidden: user.hidden,
            country: user.country.clone(),
            city: user.city.clone(),
            picture: user.picture,
            stash: user
                .stash
                .iter()
                .filter_map(|id| self.bottles.get(id))
                .map(|b| StashEntry {
                    id: b.id,
                    count: b.count,
                    volume: b.volume,
                    price: b.price,
                    bottled: b.bottled,
                    expiration: b.expiration,
                    added: b.added,
                    beer: b.beer,
                    picture: b.picture,
                })
                .collect(),
            ratings: user.ratings.clone(),
        }
    }
}
