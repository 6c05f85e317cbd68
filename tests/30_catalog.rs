mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{expect_error, expect_json, id_of, TestServer};

#[tokio::test]
async fn beer_lists_with_its_brewery_name() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;

    let beer = server.westvleteren_xii(&token).await?;
    assert_eq!(beer["brewery"]["name"], "Westvleteren");
    assert_eq!(beer["ratings"], json!([]));

    let res = server.get("/beers").send().await?;
    let beers = expect_json(res, StatusCode::OK).await?;
    let beers = beers.as_array().cloned().unwrap_or_default();
    assert_eq!(beers.len(), 1);
    assert_eq!(beers[0]["name"], "XII");
    assert_eq!(beers[0]["abv"], 12.2);
    assert_eq!(beers[0]["brewery"]["name"], "Westvleteren");
    Ok(())
}

#[tokio::test]
async fn brewery_lists_the_beers_created_for_it() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;
    let brewery = server.brewery(&token, "Westvleteren").await?;
    let brewery_id = id_of(&brewery)?;

    let xii = server.beer(&token, brewery_id, "XII", 12.2).await?;
    let blond = server.beer(&token, brewery_id, "Blond", 5.8).await?;

    let res = server.get("/breweries/Westvleteren").send().await?;
    let brewery = expect_json(res, StatusCode::OK).await?;
    let ids: Vec<_> = brewery["beers"]
        .as_array()
        .map(|beers| beers.iter().map(|b| b["id"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![xii["id"].clone(), blond["id"].clone()]);
    Ok(())
}

#[tokio::test]
async fn beer_key_is_unique() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;
    let beer = server.westvleteren_xii(&token).await?;
    let brewery_id = beer["brewery"]["id"].clone();

    let res = server
        .post("/beers")
        .bearer_auth(&token)
        .json(&json!({ "breweryId": brewery_id, "name": "XII", "abv": 12.2 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.get("/beers/Westvleteren/XII/12.2").send().await?;
    let found = expect_json(res, StatusCode::OK).await?;
    assert_eq!(found["id"], beer["id"]);

    let res = server.get(&format!("/beers/{}/XII/12.2", brewery_id.as_str().unwrap_or_default())).send().await?;
    let found = expect_json(res, StatusCode::OK).await?;
    assert_eq!(found["id"], beer["id"]);
    Ok(())
}

#[tokio::test]
async fn missing_beer_lookup_is_no_content() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;
    server.westvleteren_xii(&token).await?;

    for path in [
        "/beers/Westvleteren/XII/8",
        "/beers/Westvleteren/XI/12.2",
        "/beers/Plevna/XII/12.2",
        "/beers/Westvleteren/XII/vahva",
    ] {
        let res = server.get(path).send().await?;
        assert_eq!(res.status(), StatusCode::NO_CONTENT, "{}", path);
    }

    let res = server.get("/breweries/Plevna").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn beer_needs_an_existing_brewery() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;

    let res = server
        .post("/beers")
        .bearer_auth(&token)
        .json(&json!({ "breweryId": "00000000-0000-4000-8000-000000000000", "name": "XII", "abv": 12.2 }))
        .send()
        .await?;
    assert_eq!(expect_error(res, StatusCode::NOT_FOUND).await?, "no such brewery");

    let res = server
        .post("/beers")
        .bearer_auth(&token)
        .json(&json!({ "name": "XII" }))
        .send()
        .await?;
    let message = expect_error(res, StatusCode::BAD_REQUEST).await?;
    assert!(message.contains("`breweryId` is required"));
    assert!(message.contains("`abv` is required"));
    Ok(())
}

#[tokio::test]
async fn brewery_name_is_required_and_unique() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.user("Somero").await?;
    server.brewery(&token, "Westvleteren").await?;

    let res = server
        .post("/breweries")
        .bearer_auth(&token)
        .json(&json!({ "name": "Westvleteren" }))
        .send()
        .await?;
    assert!(expect_error(res, StatusCode::BAD_REQUEST).await?.contains("expected `name` to be unique"));

    let res = server.post("/breweries").bearer_auth(&token).json(&json!({})).send().await?;
    assert!(expect_error(res, StatusCode::BAD_REQUEST).await?.contains("`name` is required"));
    Ok(())
}
