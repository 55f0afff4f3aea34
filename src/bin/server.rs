use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use snake_arena_server::config::ServerConfig;
use snake_arena_server::high_score_store::HighScoreStore;
use snake_arena_server::rng::Rng;
use snake_arena_server::server_protocol::{parse_client_message, translate_key, ParsedClientMessage};
use snake_arena_server::server_utils::{parse_seed, resolve_arena_options};
use snake_arena_server::session::GameSession;
use snake_arena_server::types::{GameEvent, Intent, SessionState};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<ServerState>;

struct ServerState {
    config: ServerConfig,
    high_scores: Mutex<HighScoreStore>,
    started: Instant,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    seed: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snake_arena_server=info,server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ServerConfig::from_env();
    if let Err(error) = config.game.validate() {
        warn!(%error, "configured game options rejected, using defaults");
    }
    let port = config.port;
    let store = HighScoreStore::new(config.high_score_path.clone());
    info!(
        path = %config.high_score_path.display(),
        high_score = store.get(),
        "high score loaded"
    );

    let static_dir = resolve_static_dir(config.static_dir.clone());
    let state = Arc::new(ServerState {
        config,
        high_scores: Mutex::new(store),
        started: Instant::now(),
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/high-score", get(high_score_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = static_dir {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; only the API and socket are served");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir(configured: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn high_score_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.high_scores.lock().await;
    Json(guard.build_response())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let seed = parse_seed(query.seed.as_deref());
    ws.on_upgrade(move |socket| handle_socket(state, socket, seed))
}

async fn handle_socket(state: SharedState, socket: WebSocket, seed: Option<u64>) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(64);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let high_score = state.high_scores.lock().await.get();
    let rng = seed.map_or_else(Rng::from_entropy, Rng::new);
    let game_options = if state.config.game.validate().is_ok() {
        state.config.game.clone()
    } else {
        Default::default()
    };
    let mut session = match GameSession::new(game_options, high_score, rng) {
        Ok(session) => session,
        Err(error) => {
            warn!(%client_id, %error, "session rejected");
            let _ = tx
                .send(OutboundMessage::Close {
                    code: 1011,
                    reason: error.to_string(),
                })
                .await;
            drop(tx);
            let _ = writer.await;
            return;
        }
    };
    info!(%client_id, ?seed, "client connected");

    let welcome = json!({
        "type": "welcome",
        "clientId": client_id,
        "highScore": session.high_score(),
        "options": session.options(),
    });
    let mut alive = send(&tx, &welcome, QueuePolicy::DisconnectOnFull);
    alive &= flush_state(&state, &mut session, &tx).await;

    while alive {
        let deadline = session.next_deadline(clock_ms(&state));
        let started = state.started;
        let wake = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(started + Duration::from_millis(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            received = ws_receiver.next() => {
                let Some(Ok(message)) = received else {
                    break;
                };
                let raw = match message {
                    Message::Text(raw) => raw.to_string(),
                    Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            alive = send_error(&tx, "invalid utf8 message");
                            continue;
                        }
                    },
                    Message::Close(_) => break,
                    _ => continue,
                };
                alive = handle_client_message(&state, &mut session, &tx, &raw).await;
            }
            _ = wake => {
                session.advance(clock_ms(&state));
                alive = flush_state(&state, &mut session, &tx).await;
            }
        }
    }

    info!(
        %client_id,
        state = ?session.state(),
        high_score = session.high_score(),
        "client disconnected"
    );
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(
    state: &SharedState,
    session: &mut GameSession,
    tx: &mpsc::Sender<OutboundMessage>,
    raw: &str,
) -> bool {
    let Some(message) = parse_client_message(raw) else {
        return send_error(tx, "invalid message");
    };
    let now = clock_ms(state);

    let intent = match message {
        ParsedClientMessage::Ping { t } => {
            return send(tx, &json!({ "type": "pong", "t": t }), QueuePolicy::DisconnectOnFull);
        }
        ParsedClientMessage::Key { key } => translate_key(&key, session.state()),
        ParsedClientMessage::Direction { dir } => Some(Intent::Direction(dir)),
        ParsedClientMessage::Pause => Some(Intent::PauseToggle),
        ParsedClientMessage::Speed { value } => Some(Intent::SpeedPreference(value)),
        ParsedClientMessage::Start {
            cols,
            rows,
            viewport_width,
            viewport_height,
        } => {
            if matches!(
                session.state(),
                SessionState::Idle | SessionState::Over | SessionState::Paused
            ) {
                let options = resolve_arena_options(
                    session.options(),
                    cols,
                    rows,
                    viewport_width,
                    viewport_height,
                );
                if let Err(error) = session.set_options(options) {
                    return send_error(tx, &error.to_string());
                }
            }
            Some(Intent::StartOrRestart)
        }
    };

    if let Some(intent) = intent {
        debug!(?intent, now, "intent");
        if let Err(error) = session.submit(intent, now) {
            warn!(%error, "start failed");
            if !send_error(tx, &error.to_string()) {
                return false;
            }
        }
    }
    session.advance(now);
    flush_state(state, session, tx).await
}

/// Sends the current snapshot with every event raised since the last flush,
/// persisting any new high score on the way.
async fn flush_state(
    state: &SharedState,
    session: &mut GameSession,
    tx: &mpsc::Sender<OutboundMessage>,
) -> bool {
    let events = session.drain_events();
    for event in &events {
        if let GameEvent::NewHighScore { value } = event {
            state.high_scores.lock().await.record(*value);
        }
    }
    let snapshot = session.snapshot(clock_ms(state));
    send(
        tx,
        &json!({
            "type": "state",
            "snapshot": snapshot,
            "events": events,
        }),
        QueuePolicy::DropOnFull,
    )
}

fn send_error(tx: &mpsc::Sender<OutboundMessage>, message: &str) -> bool {
    send(
        tx,
        &json!({ "type": "error", "message": message }),
        QueuePolicy::DisconnectOnFull,
    )
}

/// Queues a frame for the writer task. Returns false once the client should be dropped.
fn send(tx: &mpsc::Sender<OutboundMessage>, message: &Value, policy: QueuePolicy) -> bool {
    let payload = message.to_string();
    match tx.try_send(OutboundMessage::Text(payload)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => match policy {
            QueuePolicy::DropOnFull => true,
            QueuePolicy::DisconnectOnFull => {
                warn!("outbound queue full, disconnecting client");
                false
            }
        },
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

fn clock_ms(state: &ServerState) -> u64 {
    state.started.elapsed().as_millis() as u64
}

fn make_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{id}")
}
