use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use sqlx::{Executor, PgPool};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub const TEST_EMAIL: &str = "qa@varejo.test";
pub const TEST_SENHA: &str = "senha-de-teste";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new("target/debug/varejo-api");
        cmd.env("VAREJO_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL and JWT_SECRET
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
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
                // Ready on any liveness answer, even a degraded one
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
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

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Direct database handle for seeding and row-count assertions. Returns None
/// when DATABASE_URL is unset so DB-backed tests can skip cleanly.
pub async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(None);
    };

    let pool = PgPool::connect(&url).await.context("connect test pool")?;

    // Schema is idempotent (IF NOT EXISTS throughout)
    pool.execute(include_str!("../../migrations/0001_schema.sql"))
        .await
        .context("apply schema")?;

    Ok(Some(pool))
}

/// Upsert the fixture user the login tests authenticate as
pub async fn seed_user(pool: &PgPool) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(TEST_SENHA.as_bytes());
    let senha_hash = format!("{:x}", hasher.finalize());

    sqlx::query(
        "INSERT INTO usuarios (nome, email, senha_hash, ativo) \
         VALUES ('QA', $1, $2, TRUE) \
         ON CONFLICT (email) DO UPDATE SET senha_hash = $2, ativo = TRUE",
    )
    .bind(TEST_EMAIL)
    .bind(&senha_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the fixture user and log in through the API, returning a bearer token
pub async fn login(server: &TestServer, pool: &PgPool) -> Result<String> {
    seed_user(pool).await?;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({"email": TEST_EMAIL, "senha": TEST_SENHA}))
        .send()
        .await?;

    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "login failed with {}",
        res.status()
    );

    let body = res.json::<serde_json::Value>().await?;
    body["data"]["token"]
        .as_str()
        .map(|t| t.to_string())
        .context("token missing from login response")
}

/// Unique suffix so fixtures from repeated runs never collide
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
