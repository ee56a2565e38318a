//! Purpose: Provide the HTTP/JSON server for the muster roster.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server exposing list/count/create/get/update/delete.
//! Invariants: Success bodies are the bare record/array/integer; errors use
//! the `{"error": {...}}` envelope with a stable kind string.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Every list/count re-reads the data file; nothing is cached.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use muster::api::{
    Criteria, Error, ErrorKind, FileStore, LocalRoster, NewPlayer, PageSpec, PlayerOrder,
    PlayerPatch, Profession, Race,
};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub data_path: PathBuf,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
    pub cors_origins: Vec<String>,
}

struct AppState {
    roster: LocalRoster<FileStore>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        roster: LocalRoster::new(FileStore::new(config.data_path)),
    });

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/players", get(list_players).post(create_player))
        .route("/players/count", get(count_players))
        .route(
            "/players/:id",
            get(get_player).post(update_player).delete(delete_player),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http());
    if !config.cors_origins.is_empty() {
        router = router.layer(cors_layer(&config.cors_origins)?);
    }
    let app = router.with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!("listening on {}", config.bind);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, Error> {
    let mut values = Vec::with_capacity(origins.len());
    for origin in origins {
        values.push(HeaderValue::from_str(origin).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid cors origin: {origin}"))
                .with_source(err)
        })?);
    }
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(Any)
        .allow_headers(Any))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Filter criteria plus paging, as camelCase query parameters. Count accepts
/// the same shape and simply never reads the paging fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    name: Option<String>,
    title: Option<String>,
    race: Option<Race>,
    profession: Option<Profession>,
    after: Option<i64>,
    before: Option<i64>,
    banned: Option<bool>,
    min_experience: Option<i32>,
    max_experience: Option<i32>,
    min_level: Option<i32>,
    max_level: Option<i32>,
    order: Option<PlayerOrder>,
    page_number: Option<u32>,
    page_size: Option<u32>,
}

impl ListQuery {
    fn into_parts(self) -> (Criteria, PageSpec) {
        let criteria = Criteria {
            name: self.name,
            title: self.title,
            race: self.race,
            profession: self.profession,
            born_after: self.after,
            born_before: self.before,
            banned: self.banned,
            min_experience: self.min_experience,
            max_experience: self.max_experience,
            min_level: self.min_level,
            max_level: self.max_level,
            order: self.order,
        };
        let page = PageSpec {
            number: self.page_number,
            size: self.page_size,
        };
        (criteria, page)
    }
}

async fn healthz() -> Response {
    json_response(&json!({ "ok": true }))
}

async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let (criteria, page) = query.into_parts();
    match state.roster.list_players(&criteria, &page) {
        Ok(players) => json_response(&players),
        Err(err) => error_response(err),
    }
}

async fn count_players(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let (criteria, _) = query.into_parts();
    match state.roster.count_players(&criteria) {
        Ok(count) => json_response(&count),
        Err(err) => error_response(err),
    }
}

async fn create_player(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let new: NewPlayer = match serde_json::from_value(payload) {
        Ok(new) => new,
        Err(err) => return error_response(malformed_payload(err)),
    };
    match state.roster.create_player(new) {
        Ok(player) => json_response(&player),
        Err(err) => error_response(err),
    }
}

async fn get_player(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<i64>) -> Response {
    match state.roster.player_by_id(id) {
        Ok(player) => json_response(&player),
        Err(err) => error_response(err),
    }
}

async fn update_player(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let patch: PlayerPatch = match serde_json::from_value(payload) {
        Ok(patch) => patch,
        Err(err) => return error_response(malformed_payload(err)),
    };
    match state.roster.update_player(id, patch) {
        Ok(player) => json_response(&player),
        Err(err) => error_response(err),
    }
}

async fn delete_player(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
) -> Response {
    match state.roster.delete_player(id) {
        Ok(()) => json_response(&json!({ "ok": true })),
        Err(err) => error_response(err),
    }
}

fn malformed_payload(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Validation)
        .with_message("malformed player payload")
        .with_hint(err.to_string())
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

fn json_response<T: Serialize>(payload: &T) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("muster-version", HeaderValue::from_static("0"));
    response
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            field: err.field().map(str::to_string),
            id: err.id(),
        },
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("muster-version", HeaderValue::from_static("0"));
    response
}
