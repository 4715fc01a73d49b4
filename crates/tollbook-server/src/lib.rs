use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tollbook_config::Config;
use tollbook_contracts::{WebhookRequest, SIGNATURE_HEADER};
use tollbook_kernel::{execute, parse, render, CommandError};
use tracing::{error, info, info_span, warn, Instrument};

mod line;
mod store;

pub use line::{sign_body, verify_signature, LineClient};
pub use store::{MemoryStore, SqliteStore, StoreBackend};

pub async fn serve(cfg: Config) -> Result<(), String> {
    let addr: SocketAddr = cfg
        .server
        .listen_addr
        .parse()
        .map_err(|e| format!("invalid listen_addr: {e}"))?;

    let app = build_app(cfg).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("serve failed: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub async fn build_app(cfg: Config) -> Result<Router, String> {
    let callback_path = cfg.server.callback_path.clone();
    let state = AppState::new(cfg)?;
    Ok(Router::new()
        .route("/healthz", get(healthz))
        .route(&callback_path, post(callback))
        .with_state(state))
}

#[derive(Clone)]
struct AppState {
    channel_secret: Arc<str>,
    offset: FixedOffset,
    store: Arc<Mutex<StoreBackend>>,
    line: Arc<LineClient>,
}

impl AppState {
    fn new(cfg: Config) -> Result<Self, String> {
        let store = if cfg.store.kind == "sqlite" {
            let sqlite_path = cfg
                .store
                .sqlite_path
                .clone()
                .ok_or_else(|| "store.sqlite_path is required for sqlite store".to_string())?;
            StoreBackend::Sqlite(SqliteStore::open(&sqlite_path).map_err(|e| e.to_string())?)
        } else {
            StoreBackend::Memory(MemoryStore::default())
        };
        let offset = FixedOffset::east_opt(cfg.bot.utc_offset_minutes * 60)
            .ok_or_else(|| "bot.utc_offset_minutes is out of range".to_string())?;
        Ok(Self {
            channel_secret: Arc::from(cfg.line.channel_secret.as_str()),
            offset,
            store: Arc::new(Mutex::new(store)),
            line: Arc::new(LineClient::new(&cfg.line)?),
        })
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// Runs one text command against the store and renders the reply.
    async fn handle_text(&self, text: &str) -> String {
        let today = self.today();
        let outcome = {
            let mut store = self.store.lock().await;
            parse(text, today).and_then(|command| {
                info!(command = command.kind(), "executing command");
                execute(store.ledger_mut(), command)
            })
        };
        match &outcome {
            Err(CommandError::Store { op, source }) => {
                error!(op = *op, error = %source, "store operation failed");
            }
            Err(err) => info!(reason = %err, "command rejected"),
            Ok(_) => {}
        }
        render(&outcome)
    }

    async fn process_webhook(&self, request: WebhookRequest) -> usize {
        let mut handled = 0;
        for event in &request.events {
            let Some((text, reply_token)) = event.text_message() else {
                info!(event_type = %event.event_type, "ignoring non-text event");
                continue;
            };
            let reply = self.handle_text(text).await;
            if let Err(e) = self.line.reply(reply_token, &reply).await {
                warn!(error = %e, "failed to deliver reply");
            }
            handled += 1;
        }
        handled
    }
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

fn error_body(status: StatusCode, code: &str, message: String) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
}

async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), (StatusCode, Json<Value>)> {
    let span = info_span!("webhook", request_id = %uuid::Uuid::new_v4().as_simple());
    async move {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&state.channel_secret, &body, signature) {
            warn!("invalid signature, rejecting webhook");
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                "invalid_signature",
                "signature verification failed".to_string(),
            ));
        }

        let request: WebhookRequest = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "undecodable webhook body");
                return Err(error_body(
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    e.to_string(),
                ));
            }
        };

        let total = request.events.len();
        let handled = state.process_webhook(request).await;
        info!(total, handled, "webhook processed");
        Ok((StatusCode::OK, "OK"))
    }
    .instrument(span)
    .await
}
