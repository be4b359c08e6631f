// Requests rejected before any database access

mod common;

use anyhow::Result;
use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/users/current-user",
        "/videos/getAll-videos",
        "/likes/likedVideos",
        "/subscription/u/64b7f0c2a1b2c3d4e5f60718",
    ] {
        let (status, body) = common::envelope(client.get(server.api(path)).send().await?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["message"], "Unauthorized request", "{}", path);
        assert_eq!(body["success"], false);
    }
    Ok(())
}

#[tokio::test]
async fn forged_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(server.api("/users/current-user"))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid access token");
    Ok(())
}

#[tokio::test]
async fn login_needs_an_identifier() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.api("/users/login"))
        .json(&json!({ "password": "secret" }))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username or email is required");
    assert_eq!(body["errors"][0]["field"], "username");
    Ok(())
}

#[tokio::test]
async fn login_needs_a_password() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.api("/users/login"))
        .json(&json!({ "email": "someone@example.com", "password": "   " }))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password is required");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.api("/users/login"))
        .header("content-type", "application/json")
        .body("{\"username\": ")
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Malformed JSON"));
    Ok(())
}

#[tokio::test]
async fn register_reports_the_first_missing_field() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let form = Form::new().text("fullname", "Ada Lovelace").text("username", "ada");
    let res = client.post(server.api("/users/register")).multipart(form).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is required");

    let form = Form::new()
        .text("fullname", "Ada Lovelace")
        .text("username", "ada")
        .text("email", "ada@example.com")
        .text("password", "secret");
    let res = client.post(server.api("/users/register")).multipart(form).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Avatar is required");
    Ok(())
}

#[tokio::test]
async fn register_requires_multipart() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.api("/users/register"))
        .json(&json!({ "username": "ada" }))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn refresh_without_a_token_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.api("/users/refresh-token"))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized request");
    Ok(())
}
