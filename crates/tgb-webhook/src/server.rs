use std::{io, sync::Arc};

use anyhow::Context;
use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    routing, Router,
};
use tgb_core::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::WebhookIngest;

/// Larger bodies are reported to the handler as read errors.
pub const MAX_BODY_SIZE: usize = 1 << 20;

/// One `POST` route at `path`; everything else is 404/405.
pub fn router(ingest: Arc<WebhookIngest>, path: &str) -> Router {
    Router::new().route(path, routing::post(receive).with_state(ingest))
}

/// Always answers 200 so Telegram does not redeliver updates we already saw
/// (or will never be able to parse).
async fn receive(State(ingest): State<Arc<WebhookIngest>>, body: Body) -> StatusCode {
    let body = axum::body::to_bytes(body, MAX_BODY_SIZE).await;

    // Handlers may call the blocking client.
    let task = tokio::task::spawn_blocking(move || match body {
        Ok(bytes) => ingest.handle_body(&bytes),
        Err(e) => ingest.handle_error(Error::Io(io::Error::other(e))),
    });
    if let Err(e) = task.await {
        error!("update handler panicked: {e}");
    }

    StatusCode::OK
}

pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("read listener address")?;
    info!(%addr, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("webhook server failed")?;

    info!("webhook server stopped");
    Ok(())
}
