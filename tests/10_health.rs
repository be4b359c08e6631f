mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::ensure_server().await?;
    let (status, body) = common::envelope(reqwest::get(server.url("/")).await?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["endpoints"]["videos"], "/api/v1/videos");
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;
    let (status, body) = common::envelope(reqwest::get(server.url("/health")).await?).await?;

    if common::db_enabled() {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["database"], "ok");
    } else {
        // Without a database the ping fails, but the envelope is still well-formed
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Database unavailable");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_routes_get_the_error_envelope() -> Result<()> {
    let server = common::ensure_server().await?;
    let (status, body) = common::envelope(reqwest::get(server.api("/nope")).await?).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 404);
    assert_eq!(body["message"], "Route GET /api/v1/nope not found");
    assert_eq!(body["errors"], serde_json::json!([]));
    Ok(())
}
