//! HTTP transport for the protocol engine.
//!
//! The engine is blocking, so every request runs on tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Form, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tokio::signal::unix::{signal, SignalKind};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::oai::Engine;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

type Args = Vec<(String, String)>;

/// Routes: `GET`/`POST /oai` and `GET /health`.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/oai", get(oai_get).post(oai_post))
        .route("/health", get(health))
        .with_state(engine)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn oai_get(
    State(engine): State<Arc<Engine>>,
    Query(args): Query<Args>,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    respond(engine, args).await
}

async fn oai_post(
    State(engine): State<Arc<Engine>>,
    Form(args): Form<Args>,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    respond(engine, args).await
}

async fn respond(
    engine: Arc<Engine>,
    args: Args,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    let body = tokio::task::spawn_blocking(move || engine.respond(args))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "request handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body))
}

/// Delete expired resumption tokens every `interval`. A zero interval
/// disables sweeping.
async fn sweep_tokens(engine: Arc<Engine>, interval: Duration) {
    if interval.is_zero() {
        return;
    }
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || engine.tokens().sweep(Utc::now())).await {
            Ok(Ok(removed)) => tracing::debug!(removed, "token sweep finished"),
            Ok(Err(e)) => tracing::warn!(error = %e, "token sweep failed"),
            Err(e) => tracing::error!(error = %e, "token sweep panicked"),
        }
    }
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler");
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received SIGINT, shutting down");
            }
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
    }
}

async fn run(engine: Arc<Engine>, addr: SocketAddr, sweep_interval: Duration) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");

    let sweeper = tokio::spawn(sweep_tokens(Arc::clone(&engine), sweep_interval));
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    sweeper.abort();

    tracing::info!("server stopped");
    Ok(())
}

/// Serve the engine until SIGINT or SIGTERM.
///
/// The engine owns blocking HTTP clients, which must be created and dropped
/// outside of the async runtime; this function owns the runtime for that
/// reason.
pub fn serve(engine: Engine, addr: SocketAddr, sweep_interval: Duration) -> Result<()> {
    let engine = Arc::new(engine);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(Arc::clone(&engine), addr, sweep_interval));
    drop(runtime);
    result
}
