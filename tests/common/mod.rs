use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::multipart;
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/bookhub-api");
        cmd.env("PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL and JWT_SECRET from .env (loaded by the server)
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // OK means migrations ran and the database answers, so the
                // API below is actually usable
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

/// Spawn (once) and wait for the API under test. Returns None when no
/// DATABASE_URL is configured, so suites can skip instead of failing on
/// machines without a database.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let _ = dotenvy::dotenv();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL is not set");
        return Ok(None);
    }

    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(Some(server))
}

/// Emails must be unique across runs; the database persists between them.
pub fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}@example.com", prefix, nanos)
}

/// Register a fresh user (a fresh tenant) and log in, returning the bearer token.
pub async fn signup(server: &TestServer, client: &reqwest::Client) -> Result<String> {
    signup_as(server, client, &unique_email("reader"), "Tester").await
}

pub async fn signup_as(
    server: &TestServer,
    client: &reqwest::Client,
    email: &str,
    name: &str,
) -> Result<String> {
    let res = client
        .post(format!("{}/users", server.base_url))
        .json(&json!({ "name": name, "email": email, "password": "secret99" }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "register failed: {}",
        res.text().await?
    );

    login(server, client, email, "secret99").await
}

pub async fn login(
    server: &TestServer,
    client: &reqwest::Client,
    email: &str,
    password: &str,
) -> Result<String> {
    let res = client
        .post(format!("{}/users/login", server.base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "login failed: {}",
        res.text().await?
    );

    let body = res.json::<Value>().await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("login response missing data.token")
}

/// A well-formed payload for the `data` part of the create-book form.
pub fn book_json(title: &str, genre: &str, author: &str) -> Value {
    json!({
        "title": title,
        "genre": genre,
        "description": "A sturdy shelf staple for every reading list.",
        "authorName": author,
        "sellingPrice": 25.0,
        "buyingPrice": 14.0,
        "quantity": 4,
    })
}

/// 1x1 transparent PNG, enough to stand in for a real cover scan.
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xfc,
        0xcf, 0xc0, 0x50, 0x0f, 0x00, 0x04, 0x85, 0x01, 0x80, 0x84, 0xa9, 0x8c, 0x21, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ]
}

pub fn book_form(data: &Value) -> Result<multipart::Form> {
    let image = multipart::Part::bytes(tiny_png())
        .file_name("cover.png")
        .mime_str("image/png")?;
    Ok(multipart::Form::new()
        .text("data", data.to_string())
        .part("image", image))
}

/// Create a book through the API and return the created record.
pub async fn create_book(
    server: &TestServer,
    client: &reqwest::Client,
    token: &str,
    data: &Value,
) -> Result<Value> {
    let res = client
        .post(format!("{}/books", server.base_url))
        .bearer_auth(token)
        .multipart(book_form(data)?)
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "create book failed: {}",
        res.text().await?
    );

    let body = res.json::<Value>().await?;
    Ok(body["data"].clone())
}
