#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

use stash_api::config::AppConfig;
use stash_api::store::MemoryStore;
use stash_api::{app, AppState};

/// In-process server on an ephemeral port backed by a fresh memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "integration-test-secret".to_string();
        config.security.bcrypt_cost = 4;

        let state = AppState::new(Arc::new(MemoryStore::new()), config.security.clone());
        let router = app(state, &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Registers a user whose password is `salainen` and name is the
    /// username in lowercase.
    pub async fn register(&self, username: &str) -> Result<Value> {
        let res = self
            .post("/users")
            .json(&json!({
                "username": username,
                "password": "salainen",
                "name": username.to_lowercase(),
                "email": format!("{}@example.com", username.to_lowercase()),
            }))
            .send()
            .await?;
        expect_json(res, StatusCode::OK).await
    }

    pub async fn login(&self, username: &str) -> Result<String> {
        let res = self
            .post("/login")
            .json(&json!({ "username": username, "password": "salainen" }))
            .send()
            .await?;
        let body = expect_json(res, StatusCode::OK).await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    /// Registers and logs in; returns the user document and a token.
    pub async fn user(&self, username: &str) -> Result<(Value, String)> {
        let user = self.register(username).await?;
        let token = self.login(username).await?;
        Ok((user, token))
    }

    pub async fn brewery(&self, token: &str, name: &str) -> Result<Value> {
        let res = self
            .post("/breweries")
            .bearer_auth(token)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        expect_json(res, StatusCode::OK).await
    }

    pub async fn beer(&self, token: &str, brewery: &str, name: &str, abv: f64) -> Result<Value> {
        let res = self
            .post("/beers")
            .bearer_auth(token)
            .json(&json!({ "breweryId": brewery, "name": name, "abv": abv }))
            .send()
            .await?;
        expect_json(res, StatusCode::OK).await
    }

    /// Westvleteren XII. Returns the beer document.
    pub async fn westvleteren_xii(&self, token: &str) -> Result<Value> {
        let brewery = self.brewery(token, "Westvleteren").await?;
        self.beer(token, id_of(&brewery)?, "XII", 12.2).await
    }

    pub async fn bottle(&self, token: &str, beer: &str) -> Result<Value> {
        let res = self
            .post("/bottles")
            .bearer_auth(token)
            .json(&json!({ "beerId": beer, "count": 2, "volume": 0.33 }))
            .send()
            .await?;
        expect_json(res, StatusCode::OK).await
    }

    pub async fn rating(&self, token: &str, beer: &str) -> Result<Value> {
        let res = self
            .post("/ratings")
            .bearer_auth(token)
            .json(&json!({
                "beerId": beer,
                "aroma": 8,
                "taste": 9,
                "mouthfeel": 4,
                "appearance": 5,
                "overall": 18,
                "description": "Dark fruit and caramel",
                "ageOfBeer": 30
            }))
            .send()
            .await?;
        expect_json(res, StatusCode::OK).await
    }

    pub async fn find_user(&self, username: &str) -> Result<Value> {
        let res = self.get(&format!("/users/{}", username)).send().await?;
        expect_json(res, StatusCode::OK).await
    }
}

pub fn id_of(doc: &Value) -> Result<&str> {
    doc["id"].as_str().with_context(|| format!("document has no id: {}", doc))
}

pub async fn expect_json(res: Response, status: StatusCode) -> Result<Value> {
    let actual = res.status();
    let body = res.text().await?;
    anyhow::ensure!(actual == status, "expected {}, got {}: {}", status, actual, body);
    serde_json::from_str(&body).with_context(|| format!("response is not JSON: {}", body))
}

/// Asserts the status and returns the `error` message of an error body.
pub async fn expect_error(res: Response, status: StatusCode) -> Result<String> {
    let body = expect_json(res, status).await?;
    body["error"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("error body has no message: {}", body))
}
