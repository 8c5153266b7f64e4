//! syncmarks RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.create", "params":{"title":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Push:     {"event":"bookmarks", "items":[...]} after every store change of a mounted dashboard.

use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use syncmarks::app::App;
use syncmarks::logging;
use syncmarks::rpc_handler::{handle_method, RpcState};
use syncmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Fixed one-second window limiter across all methods.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count = self.request_count.saturating_add(1);
        self.request_count <= self.max_per_second
    }
}

/// Single writer for stdout; responses and pushed events share the channel.
fn spawn_writer(mut rx: mpsc::UnboundedReceiver<Value>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = rx.recv().await {
            let line = format!("{}\n", message);
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    })
}

#[tokio::main]
async fn main() {
    let mut engine = SettingsEngine::new(std::env::var("SYNCMARKS_CONFIG").ok());
    let loaded = engine.load();
    logging::init(&engine.get_settings().logging);
    if let Err(e) = loaded {
        warn!(error = %e, "settings not loaded, using defaults");
    }
    let settings = engine.get_settings().clone();
    let max_per_second = settings.rpc.max_requests_per_second;

    let app = match App::new(settings) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialize syncmarks");
            std::process::exit(1);
        }
    };

    let (out, rx) = mpsc::unbounded_channel();
    let writer = spawn_writer(rx);
    let state = RpcState::new(app).with_events(out.clone());

    let _ = out.send(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    info!("rpc server ready");

    let mut rate_limiter = RateLimiter::new(max_per_second);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out.send(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&state, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        let _ = out.send(response);
    }

    // Unmount so the feed subscription is released before exit.
    let _ = handle_method(&state, "dashboard.unmount", &Value::Null).await;
    drop(state);
    drop(out);
    let _ = writer.await;
    info!("rpc server stopped");
}
