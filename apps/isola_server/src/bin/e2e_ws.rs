//! Manual end-to-end probe: boots a server on dedicated ports, logs a GM
//! and a player in, opens the player's WebSocket, fires a GM command and
//! asserts the invalidation push plus the re-fetched state.
//!
//! Expects `target/debug/isola_server` to exist (cargo build first).

use std::process::Stdio;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio_tungstenite::tungstenite::protocol::Message;

const BIND: &str = "127.0.0.1:41807";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = std::env::temp_dir().join(format!("isola_e2e_{}", std::process::id()));

    let mut server = Command::new("target/debug/isola_server")
        .env("BIND", BIND)
        .env("DATA_DIR", &data_dir)
        .env("TICK_INTERVAL_S", "3600")
        .env("GM_NAMES", "riko")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    wait_tcp(BIND, Duration::from_secs(10)).await?;

    let res = run_probe().await;

    let _ = server.kill().await;
    let _ = std::fs::remove_dir_all(&data_dir);
    res
}

async fn wait_tcp(bind: &str, timeout: Duration) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if TcpStream::connect(bind).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("timeout waiting for tcp {bind}");
}

async fn run_probe() -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let base = format!("http://{BIND}");

    for (name, password) in [("riko", "segreta"), ("bob", "password")] {
        let resp = http
            .post(format!("{base}/login"))
            .json(&serde_json::json!({ "name": name, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "login {name}: {}", resp.status());
    }

    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{BIND}/ws?name=bob")).await?;
    let (_sink, mut stream) = ws.split();

    let resp = http
        .post(format!("{base}/gm/command"))
        .json(&serde_json::json!({ "name": "riko", "command": "give bob Roccia 2" }))
        .send()
        .await?;
    anyhow::ensure!(resp.status().is_success(), "gm command: {}", resp.status());

    // The push must arrive, and it must be the bare invalidation signal.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            anyhow::bail!("timed out waiting for invalidation push");
        }
        let m = match tokio::time::timeout(remaining, stream.next()).await {
            Ok(Some(m)) => m?,
            Ok(None) => anyhow::bail!("ws closed before push"),
            Err(_) => continue,
        };
        if let Message::Binary(b) = m {
            anyhow::ensure!(b == isolaproto::UPDATE_SIGNAL, "unexpected push payload");
            break;
        }
    }

    // Re-fetch like a real client would.
    let v: serde_json::Value = http
        .get(format!("{base}/player"))
        .query(&[("name", "bob")])
        .send()
        .await?
        .json()
        .await?;
    let n = v["player"]["inventory"]
        .as_array()
        .map(|a| a.len())
        .unwrap_or(0);
    anyhow::ensure!(n == 2, "expected 2 items after give, got {n}");

    println!("isola e2e ok");
    Ok(())
}
