use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use medrag_rag::{Answer, RetrievalQa};
use rust_embed::RustEmbed;
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "assets/static/"]
struct StaticAssets;

/// Shared state: the answering chain, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub qa: Arc<RetrievalQa>,
}

impl AppState {
    pub fn new(qa: Arc<RetrievalQa>) -> Self {
        Self { qa }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

/// Form body of `POST /get_response`.
#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub query: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/get_response", post(get_response))
        .route("/static/{*path}", get(static_asset))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until Ctrl-C.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("medrag listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../assets/index.html"))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "medrag-server",
        "collection": state.qa.collection(),
    }))
}

async fn get_response(
    State(state): State<AppState>,
    form: Result<Form<QueryForm>, FormRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::invalid_query(e.body_text()))?;
    let answer = state.qa.answer(&form.query).await.inspect_err(|e| {
        warn!(error = %e, "failed to answer query");
    })?;
    Ok(Json(answer))
}

async fn static_asset(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], file.data).into_response()
        }
        None => ApiError::not_found(format!("no static asset '{path}'")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_assets_are_embedded() {
        assert!(StaticAssets::get("style.css").is_some());
        assert!(StaticAssets::get("app.js").is_some());
        assert!(StaticAssets::get("missing.css").is_none());
    }

    #[test]
    fn default_address_is_local() {
        let config = ServerConfig::default();
        assert_eq!(format!("{}:{}", config.host, config.port), "127.0.0.1:8000");
    }
}
