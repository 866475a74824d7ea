mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{bearer, session, TestServer, LONG_ANSWER};
use devflow_api::database::MemoryStore;

async fn server() -> Result<TestServer> {
    TestServer::spawn(Arc::new(MemoryStore::with_timeout(Duration::from_secs(2)))).await
}

#[tokio::test]
async fn health_and_root_respond() -> Result<()> {
    let srv = server().await?;

    let res = srv.client.get(srv.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["status"], "ok");

    let body: Value = srv.client.get(srv.url("/")).send().await?.json().await?;
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn question_lifecycle_over_http() -> Result<()> {
    let srv = server().await?;
    let alice = session("Alice");
    let bob = session("Bob");
    let (alice_auth, bob_auth) = (bearer(&alice)?, bearer(&bob)?);

    let res = srv
        .client
        .put(srv.url("/api/users/me"))
        .header("Authorization", &alice_auth)
        .json(&json!({ "username": "alice_dev" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], "alice_dev");

    let res = srv
        .client
        .post(srv.url("/api/questions"))
        .header("Authorization", &alice_auth)
        .json(&json!({ "title": "HTTP question", "content": "Body", "tags": ["http", "axum"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    let question_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = srv
        .client
        .post(srv.url(&format!("/api/questions/{}/answers", question_id)))
        .header("Authorization", &bob_auth)
        .json(&json!({ "content": LONG_ANSWER }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let answer_id = res.json::<Value>().await?["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = srv
        .client
        .post(srv.url("/api/votes"))
        .header("Authorization", &bob_auth)
        .json(&json!({ "targetId": question_id, "targetType": "question", "voteType": "upvote" }))
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"], json!({ "hasUpvoted": true, "hasDownvoted": false }));

    let body: Value = srv
        .client
        .get(srv.url(&format!("/api/votes/question/{}", question_id)))
        .header("Authorization", &bob_auth)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["hasUpvoted"], true);

    let body: Value = srv
        .client
        .get(srv.url(&format!("/api/questions/{}", question_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(body["data"]["answers"], 1);
    assert_eq!(body["data"]["author"]["name"], "Alice");

    let body: Value = srv
        .client
        .get(srv.url(&format!("/api/questions/{}/answers?page=1&pageSize=5&filter=oldest", question_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["isNext"], false);

    let res = srv
        .client
        .post(srv.url(&format!("/api/collections/{}", question_id)))
        .header("Authorization", &bob_auth)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["saved"], true);

    let body: Value = srv
        .client
        .get(srv.url("/api/collections?query=http"))
        .header("Authorization", &bob_auth)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["total"], 1);

    let res = srv
        .client
        .delete(srv.url(&format!("/api/answers/{}", answer_id)))
        .header("Authorization", &alice_auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url(&format!("/api/questions/{}", question_id)))
        .header("Authorization", &alice_auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url(&format!("/api/questions/{}", question_id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn missing_or_invalid_tokens_are_anonymous() -> Result<()> {
    let srv = server().await?;
    let input = json!({ "title": "Anonymous attempt", "content": "Body", "tags": ["x"] });

    let res = srv.client.post(srv.url("/api/questions")).json(&input).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let res = srv
        .client
        .post(srv.url("/api/questions"))
        .header("Authorization", "Bearer not.a.jwt")
        .json(&input)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/api/collections")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_validation_errors() -> Result<()> {
    let srv = server().await?;
    let auth = bearer(&session("Alice"))?;

    let res = srv
        .client
        .post(srv.url("/api/questions"))
        .header("Authorization", &auth)
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["body"].is_array());

    let res = srv.client.get(srv.url("/api/questions/not-a-uuid")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/api/votes/comment/00000000-0000-0000-0000-000000000000"))
        .header("Authorization", &auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
