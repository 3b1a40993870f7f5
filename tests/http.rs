//! Driver and runner talking to a live bridge over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use selenese_bridge::{Bridge, Command, SessionId};

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Thin client for the bridge routes of one session.
#[derive(Clone)]
struct SessionClient {
    http: Client,
    base_url: String,
    session_id: String,
}

impl SessionClient {
    fn new(bridge: &Bridge, session_id: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: bridge.base_url(),
            session_id: session_id.to_string(),
        }
    }

    async fn drive(&self, command: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .get(format!("{}/driver", self.base_url))
            .query(&[
                ("sessionId", self.session_id.as_str()),
                ("commandRequest", command),
            ])
            .send()
            .await?;
        Ok((response.status(), response.text().await?))
    }

    async fn drive_in_body(&self, command: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .post(format!("{}/driver", self.base_url))
            .query(&[("sessionId", self.session_id.as_str())])
            .body(command.to_string())
            .send()
            .await?;
        Ok((response.status(), response.text().await?))
    }

    async fn poll(&self, flag: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .get(format!("{}/runner", self.base_url))
            .query(&[("sessionId", self.session_id.as_str()), (flag, "true")])
            .send()
            .await?;
        Ok((response.status(), response.text().await?))
    }

    async fn post_result(&self, result: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .post(format!("{}/runner", self.base_url))
            .query(&[("sessionId", self.session_id.as_str())])
            .body(result.to_string())
            .send()
            .await?;
        Ok((response.status(), response.text().await?))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn driver_and_runner_round_trip() -> Result<()> {
    init_tracing();

    let bridge = Bridge::builder()
        .driver_timeout(Duration::from_secs(5))
        .runner_timeout(Duration::from_secs(2))
        .start()
        .await?;
    let client = SessionClient::new(&bridge, "it");

    let driver = {
        let client = client.clone();
        tokio::spawn(async move { client.drive("|open|/home||").await })
    };

    let (status, command) = client.poll("seleniumStart").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(command, "|open|/home||");

    let runner = {
        let client = client.clone();
        tokio::spawn(async move { client.post_result("OK").await })
    };

    let (status, result) = driver.await??;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result, "OK");

    let (status, body) = client.drive_in_body("|testComplete|||").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");

    let (status, command) = runner.await??;
    assert_eq!(status, StatusCode::OK);
    assert!(command.parse::<Command>()?.is_test_complete());

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_runner_is_told_to_retry() -> Result<()> {
    init_tracing();

    let bridge = Bridge::builder()
        .runner_timeout(Duration::from_millis(200))
        .start()
        .await?;
    let client = SessionClient::new(&bridge, "idle");

    let (status, body) = client.poll("seleniumStart").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.parse::<Command>()?.is_retry_last());

    let (status, body) = client.poll("retry").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.parse::<Command>()?.is_retry_last());

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_command_is_rejected() -> Result<()> {
    init_tracing();

    let bridge = Bridge::builder().start().await?;
    let client = SessionClient::new(&bridge, "bad");

    let (status, body) = client.drive("open").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(error["error"]["code"], "malformed_command");

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_restart_releases_driver() -> Result<()> {
    init_tracing();

    let bridge = Bridge::builder()
        .no_driver_timeout()
        .runner_timeout(Duration::from_secs(1))
        .start()
        .await?;
    let client = SessionClient::new(&bridge, "reload");

    let driver = {
        let client = client.clone();
        tokio::spawn(async move { client.drive("|click|id=go||").await })
    };

    let (_, command) = client.poll("seleniumStart").await?;
    assert_eq!(command, "|click|id=go||");

    // The page reloads instead of posting a result.
    let (status, body) = client.poll("seleniumStart").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.parse::<Command>()?.is_retry_last());

    let (status, body) = tokio::time::timeout(Duration::from_secs(5), driver)
        .await
        .context("driver still blocked")???;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("restarted"));

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_releases_blocked_driver() -> Result<()> {
    init_tracing();

    let bridge = Bridge::builder().no_driver_timeout().start().await?;
    let client = SessionClient::new(&bridge, "stuck");

    let driver = {
        let client = client.clone();
        tokio::spawn(async move { client.drive_in_body("|click|go||").await })
    };

    // Wait until the driver's session exists, then pull the command so
    // the driver is parked on the result.
    let id = SessionId::new("stuck");
    let rendezvous = loop {
        if let Some(rendezvous) = bridge.registry().get(&id) {
            break rendezvous;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    let command = tokio::task::spawn_blocking(move || rendezvous.poll(None)).await??;
    assert_eq!(command.verb(), "click");

    tokio::time::timeout(Duration::from_secs(5), bridge.shutdown())
        .await
        .context("shutdown hung")?;

    let (status, body) = driver.await??;
    assert_eq!(status, StatusCode::GONE);
    assert!(body.contains("channel_closed"));
    Ok(())
}
