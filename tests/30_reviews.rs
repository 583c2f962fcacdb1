mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn review_with_comments_and_soft_delete() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (user_id, token) = server.signup("alice", "pw").await?;

    server
        .client
        .post(server.api("/phones"))
        .bearer_auth(&token)
        .json(&json!({"name": "Pixel", "brand": "Google"}))
        .send()
        .await?
        .error_for_status()?;

    let review: Value = server
        .client
        .post(server.api("/reviews"))
        .bearer_auth(&token)
        .json(&json!({"phone_id": 1, "rating": 4, "content": "good battery"}))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(review["user_id"], user_id);
    let review_id = review["id"].as_i64().unwrap_or_default();

    let res = server
        .client
        .post(server.api("/comments"))
        .bearer_auth(&token)
        .json(&json!({"review_id": review_id, "content": "same here"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let loaded: Value = server
        .client
        .get(server.api(&format!("/reviews/{}", review_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(loaded["comments"][0]["content"], "same here");

    let by_phone: Vec<Value> = server
        .client
        .get(server.api("/phones/1/reviews"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(by_phone.len(), 1);

    server
        .client
        .delete(server.api(&format!("/reviews/{}", review_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .error_for_status()?;

    let res = server
        .client
        .get(server.api(&format!("/reviews/{}", review_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn rating_out_of_range_is_bad_request() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, token) = server.signup("alice", "pw").await?;

    let res = server
        .client
        .post(server.api("/reviews"))
        .bearer_auth(&token)
        .json(&json!({"phone_id": 1, "rating": 0, "content": "zero"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
