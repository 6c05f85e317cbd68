use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::{Beer, Bottle, Brewery, Picture, Rating, User};

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Vec<User>,
    breweries: Vec<Brewery>,
    beers: Vec<Beer>,
    bottles: Vec<Bottle>,
    ratings: Vec<Rating>,
    // Shared so copying the collections never copies image bytes.
    pictures: Vec<Arc<Picture>>,
}

/// Process-local store. Units of work run one at a time. The first write
/// in a unit copies the collections; the copy replaces the shared state on
/// commit, and read-only units copy nothing.
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<Mutex<Collections>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn unit(&self) -> MemoryUnit {
        MemoryUnit {
            guard: self.0.clone().lock_owned().await,
            working: None,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(self.unit().await))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<Collections>,
    working: Option<Collections>,
}

impl MemoryUnit {
    fn read(&self) -> &Collections {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn write(&mut self) -> &mut Collections {
        let shared = &self.guard;
        self.working.get_or_insert_with(|| Collections::clone(shared))
    }
}

#[inline]
fn find_ref<T, P>(v: &[T], predicate: P) -> Option<&T>
where
    P: FnMut(&&T) -> bool,
{
    v.iter().find(predicate)
}

#[inline]
fn find_mut<T, P>(v: &mut [T], predicate: P) -> Option<&mut T>
where
    P: FnMut(&&mut T) -> bool,
{
    v.iter_mut().find(predicate)
}

/// Rejects a second document with the same key, like a unique index would.
#[inline]
fn ensure_unique<T, P>(v: &[T], constraint: &str, predicate: P) -> StoreResult<()>
where
    P: FnMut(&T) -> bool,
{
    if v.iter().any(predicate) {
        return Err(StoreError::UniqueViolation(constraint.to_string()));
    }
    Ok(())
}

/// Removes matching documents and returns them.
fn drain_matching<T, P>(v: &mut Vec<T>, mut predicate: P) -> Vec<T>
where
    P: FnMut(&T) -> bool,
{
    let (removed, kept): (Vec<T>, Vec<T>) = std::mem::take(v).into_iter().partition(|item| predicate(item));
    *v = kept;
    removed
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn users(&mut self) -> StoreResult<Vec<User>> {
        Ok(self.read().users.clone())
    }

    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(find_ref(&self.read().users, |u| u.id == id).cloned())
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(find_ref(&self.read().users, |u| u.username == username).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(find_ref(&self.read().users, |u| u.email.as_deref() == Some(email)).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        ensure_unique(&self.write().users, "users_username_key", |u| u.username == user.username)?;
        if let Some(email) = user.email.as_deref() {
            ensure_unique(&self.write().users, "users_email_key", |u| u.email.as_deref() == Some(email))?;
        }
        self.write().users.push(user.clone());
        Ok(())
    }

    async fn update_user_profile(&mut self, user: &User) -> StoreResult<bool> {
        if let Some(email) = user.email.as_deref() {
            ensure_unique(&self.write().users, "users_email_key", |u| {
                u.id != user.id && u.email.as_deref() == Some(email)
            })?;
        }
        match find_mut(&mut self.write().users, |u| u.id == user.id) {
            Some(existing) => {
                existing.password_hash = user.password_hash.clone();
                existing.name = user.name.clone();
                existing.email = user.email.clone();
                existing.hidden = user.hidden;
                existing.country = user.country.clone();
                existing.city = user.city.clone();
                existing.picture = user.picture;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(!drain_matching(&mut self.write().users, |u| u.id == id).is_empty())
    }

    async fn push_stash(&mut self, user: Uuid, bottle: Uuid) -> StoreResult<bool> {
        match find_mut(&mut self.write().users, |u| u.id == user) {
            Some(u) => {
                u.stash.push(bottle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pull_from_stashes(&mut self, bottle: Uuid) -> StoreResult<u64> {
        let mut touched = 0;
        for user in self.write().users.iter_mut().filter(|u| u.stash.contains(&bottle)) {
            user.stash.retain(|b| *b != bottle);
            touched += 1;
        }
        Ok(touched)
    }

    async fn push_user_rating(&mut self, user: Uuid, rating: Uuid) -> StoreResult<bool> {
        match find_mut(&mut self.write().users, |u| u.id == user) {
            Some(u) => {
                u.ratings.push(rating);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn breweries(&mut self) -> StoreResult<Vec<Brewery>> {
        Ok(self.read().breweries.clone())
    }

    async fn brewery(&mut self, id: Uuid) -> StoreResult<Option<Brewery>> {
        Ok(find_ref(&self.read().breweries, |b| b.id == id).cloned())
    }

    async fn brewery_by_name(&mut self, name: &str) -> StoreResult<Option<Brewery>> {
        Ok(find_ref(&self.read().breweries, |b| b.name == name).cloned())
    }

    async fn insert_brewery(&mut self, brewery: &Brewery) -> StoreResult<()> {
        ensure_unique(&self.write().breweries, "breweries_name_key", |b| b.name == brewery.name)?;
        self.write().breweries.push(brewery.clone());
        Ok(())
    }

    async fn push_brewery_beer(&mut self, brewery: Uuid, beer: Uuid) -> StoreResult<bool> {
        match find_mut(&mut self.write().breweries, |b| b.id == brewery) {
            Some(b) => {
                b.beers.push(beer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn beers(&mut self) -> StoreResult<Vec<Beer>> {
        Ok(self.read().beers.clone())
    }

    async fn beer(&mut self, id: Uuid) -> StoreResult<Option<Beer>> {
        Ok(find_ref(&self.read().beers, |b| b.id == id).cloned())
    }

    async fn beer_by_key(&mut self, brewery: Uuid, name: &str, abv: f64) -> StoreResult<Option<Beer>> {
        Ok(find_ref(&self.read().beers, |b| b.same_key(brewery, name, abv)).cloned())
    }

    async fn insert_beer(&mut self, beer: &Beer) -> StoreResult<()> {
        ensure_unique(&self.write().beers, "beers_brewery_name_abv_key", |b| {
            b.same_key(beer.brewery, &beer.name, beer.abv)
        })?;
        self.write().beers.push(beer.clone());
        Ok(())
    }

    async fn push_beer_rating(&mut self, beer: Uuid, rating: Uuid) -> StoreResult<bool> {
        match find_mut(&mut self.write().beers, |b| b.id == beer) {
            Some(b) => {
                b.ratings.push(rating);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pull_beer_ratings(&mut self, ratings: &[Uuid]) -> StoreResult<u64> {
        let mut touched = 0;
        for beer in self.write().beers.iter_mut() {
            let before = beer.ratings.len();
            beer.ratings.retain(|r| !ratings.contains(r));
            if beer.ratings.len() != before {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn bottles(&mut self) -> StoreResult<Vec<Bottle>> {
        Ok(self.read().bottles.clone())
    }

    async fn bottle(&mut self, id: Uuid) -> StoreResult<Option<Bottle>> {
        Ok(find_ref(&self.read().bottles, |b| b.id == id).cloned())
    }

    async fn insert_bottle(&mut self, bottle: &Bottle) -> StoreResult<()> {
        self.write().bottles.push(bottle.clone());
        Ok(())
    }

    async fn replace_bottle(&mut self, bottle: &Bottle) -> StoreResult<bool> {
        match find_mut(&mut self.write().bottles, |b| b.id == bottle.id) {
            Some(existing) => {
                *existing = bottle.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_bottle(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(!drain_matching(&mut self.write().bottles, |b| b.id == id).is_empty())
    }

    async fn delete_bottles_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(drain_matching(&mut self.write().bottles, |b| b.user == user)
            .into_iter()
            .map(|b| b.id)
            .collect())
    }

    async fn ratings(&mut self) -> StoreResult<Vec<Rating>> {
        Ok(self.read().ratings.clone())
    }

    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()> {
        self.write().ratings.push(rating.clone());
        Ok(())
    }

    async fn delete_ratings_of(&mut self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(drain_matching(&mut self.write().ratings, |r| r.user == user)
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    async fn pictures(&mut self) -> StoreResult<Vec<Picture>> {
        Ok(self.read().pictures.iter().map(|p| Picture::clone(p)).collect())
    }

    async fn picture(&mut self, id: Uuid) -> StoreResult<Option<Picture>> {
        Ok(find_ref(&self.read().pictures, |p| p.id == id).map(|p| Picture::clone(p)))
    }

    async fn insert_picture(&mut self, picture: &Picture) -> StoreResult<()> {
        self.write().pictures.push(Arc::new(picture.clone()));
        Ok(())
    }

    async fn delete_pictures_of(&mut self, user: Uuid) -> StoreResult<u64> {
        Ok(drain_matching(&mut self.write().pictures, |p| p.user == user).len() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnit { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}
