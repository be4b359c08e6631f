#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

use videotube_api::config::{AppConfig, MediaBackend};
use videotube_api::database::DatabaseManager;
use videotube_api::services::build_media_store;
use videotube_api::{build_router, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Password shared by every account the tests register
pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

/// Database-backed tests run only when `TEST_MONGODB_URI` points at a server.
/// Everything that is rejected before touching the database runs always.
pub fn db_enabled() -> bool {
    std::env::var("TEST_MONGODB_URI")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

impl TestServer {
    /// Serve the router on its own thread and runtime so it outlives the
    /// per-test runtimes of `#[tokio::test]`.
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let config = test_config(port);

        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("test server runtime failed: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(serve(config)) {
                eprintln!("test server stopped: {:#}", e);
            }
        });

        Ok(Self { port, base_url })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

fn test_config(port: u16) -> AppConfig {
    let scratch = scratch_dir();
    let mut config = AppConfig::development();
    config.server.port = port;
    config.database.uri = std::env::var("TEST_MONGODB_URI")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "mongodb://127.0.0.1:1".to_string());
    config.database.name = format!("videotube_test_{}", uuid::Uuid::new_v4().simple());
    config.database.connect_timeout_secs = 2;
    config.media.backend = MediaBackend::Local;
    config.media.local_dir = scratch.join("media").to_string_lossy().into_owned();
    config.media.public_url = format!("http://127.0.0.1:{}/static", port);
    config.media.temp_dir = scratch.join("tmp").to_string_lossy().into_owned();
    config
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("videotube-test-{}", uuid::Uuid::new_v4().simple()))
}

async fn serve(config: AppConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.media.temp_dir).await?;
    let db = DatabaseManager::connect(&config.database).await?;
    if db_enabled() {
        db.ensure_indexes().await?;
    }
    let media = build_media_store(&config.media);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.server.port)).await?;
    axum::serve(listener, build_router(AppState::new(config, db, media))).await?;
    Ok(())
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A client that keeps the session cookies the API sets
pub fn session_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

pub fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &id[..10])
}

pub fn image(name: &str) -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\nnot-really-an-image".to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .expect("mime")
}

pub fn clip(name: &str) -> Part {
    Part::bytes(vec![0_u8; 2048])
        .file_name(name.to_string())
        .mime_str("video/mp4")
        .expect("mime")
}

/// Register `username` and return the response body's `data`
pub async fn register(client: &reqwest::Client, server: &TestServer, username: &str) -> Result<Value> {
    let form = Form::new()
        .text("fullname", format!("{} Tester", username))
        .text("username", username.to_string())
        .text("email", format!("{}@example.com", username))
        .text("password", PASSWORD)
        .part("avatar", image("avatar.png"));

    let res = client.post(server.api("/users/register")).multipart(form).send().await?;
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
    Ok(body["data"].clone())
}

/// A logged-in user: its id and a client carrying its session cookies
pub struct Session {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub client: reqwest::Client,
}

pub async fn login(server: &TestServer, username: &str) -> Result<Session> {
    let client = session_client();
    let res = client
        .post(server.api("/users/login"))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await?;
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);

    Ok(Session {
        id: body["data"]["user"]["_id"].as_str().unwrap_or_default().to_string(),
        username: username.to_string(),
        access_token: body["data"]["accessToken"].as_str().unwrap_or_default().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap_or_default().to_string(),
        client,
    })
}

/// Register a fresh user and log in
pub async fn new_session(server: &TestServer, prefix: &str) -> Result<Session> {
    let username = unique(prefix);
    register(&session_client(), server, &username).await?;
    login(server, &username).await
}

/// Upload a published video owned by `session` and return its id
pub async fn upload_video(server: &TestServer, session: &Session, title: &str) -> Result<String> {
    let form = Form::new()
        .text("title", title.to_string())
        .text("description", format!("About {}", title))
        .part("videoFile", clip("clip.mp4"))
        .part("thumbnail", image("thumb.png"));

    let res = session
        .client
        .post(server.api("/videos/upload-video"))
        .multipart(form)
        .send()
        .await?;
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == StatusCode::OK, "upload failed: {} {}", status, body);
    Ok(body["data"]["_id"].as_str().unwrap_or_default().to_string())
}

/// Status and parsed envelope of a response
pub async fn envelope(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let body = res.json::<Value>().await?;
    Ok((status, body))
}
