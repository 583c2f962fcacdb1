mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

async fn add_phone(server: &TestServer, token: &str, name: &str) -> Result<i64> {
    let res = server
        .client
        .post(server.api("/phones"))
        .bearer_auth(token)
        .json(&json!({"name": name, "brand": "Acme"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let phones: Vec<Value> = server.client.get(server.api("/phones")).send().await?.json().await?;
    let id = phones
        .iter()
        .rev()
        .find(|p| p["name"] == name)
        .and_then(|p| p["id"].as_i64());
    id.ok_or_else(|| anyhow::anyhow!("phone '{}' not listed", name))
}

#[tokio::test]
async fn phone_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.signup("alice", "pw").await?;
    let id = add_phone(&server, &token, "Pixel").await?;

    let res = server
        .client
        .put(server.api(&format!("/phones/{}", id)))
        .bearer_auth(&token)
        .json(&json!({"name": "Pixel 9", "brand": "Google"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let phone: Value = server
        .client
        .get(server.api(&format!("/phones/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(phone["name"], "Pixel 9");
    assert_eq!(phone["brand"], "Google");
    assert!(phone.get("deleted_at").is_none());

    let res = server
        .client
        .delete(server.api(&format!("/phones/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.api(&format!("/phones/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn feature_under_wrong_phone_is_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.signup("alice", "pw").await?;
    let first = add_phone(&server, &token, "First").await?;
    let second = add_phone(&server, &token, "Second").await?;

    let feature: Value = server
        .client
        .post(server.api(&format!("/phones/{}/features", first)))
        .bearer_auth(&token)
        .json(&json!({"name": "eSIM", "details": "dual"}))
        .send()
        .await?
        .json()
        .await?;
    let feature_id = feature["id"].as_i64().unwrap_or_default();

    let res = server
        .client
        .put(server.api(&format!("/phones/{}/features/{}", second, feature_id)))
        .bearer_auth(&token)
        .json(&json!({"name": "changed", "details": ""}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let phone: Value = server
        .client
        .get(server.api(&format!("/phones/{}", first)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(phone["features"][0]["name"], "eSIM");
    Ok(())
}
