//! HTTP transport
//!
//! Translates query strings into broker operations:
//! - `GET /get?folder=F&time=T` (alias `/get.php`): fetch records at or after
//!   `T`, expiring stale ones
//! - `GET /put?folder=F&msg=M` (alias `/put.php`): append a message
//! - `GET /health`
//!
//! Every reply is plain text with status 200. Refusals are the body `-1`, not
//! an HTTP error, so existing clients keep working. Broker calls do blocking
//! file I/O and run on the blocking pool.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::broker::Broker;
use crate::transport::message::{GetQuery, PutQuery, Reply};

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
}

pub fn create_router(broker: Arc<Broker>) -> Router {
    Router::new()
        .route("/get", get(get_messages))
        .route("/get.php", get(get_messages))
        .route("/put", get(put_message))
        .route("/put.php", get(put_message))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { broker })
}

/// Serve on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>) -> std::io::Result<()> {
    axum::serve(listener, create_router(broker)).await
}

pub async fn start_http_server(addr: &str, broker: Arc<Broker>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);
    serve(listener, broker).await
}

async fn get_messages(
    State(state): State<AppState>,
    query: Result<Query<GetQuery>, QueryRejection>,
) -> String {
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => {
            debug!(error = %e, "malformed get query");
            return Reply::Rejected.to_string();
        }
    };
    let cursor = query.cursor();
    let folder = query.folder.unwrap_or_default();
    let broker = state.broker.clone();

    let reply = match tokio::task::spawn_blocking(move || broker.fetch(&folder, cursor)).await {
        Ok(Ok(records)) => Reply::Records(records),
        Ok(Err(e)) => {
            debug!(error = %e, "fetch rejected");
            Reply::Rejected
        }
        Err(e) => {
            error!(error = %e, "fetch task failed");
            Reply::Rejected
        }
    };
    reply.to_string()
}

async fn put_message(
    State(state): State<AppState>,
    query: Result<Query<PutQuery>, QueryRejection>,
) -> String {
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => {
            debug!(error = %e, "malformed put query");
            return Reply::Rejected.to_string();
        }
    };
    let folder = query.folder.unwrap_or_default();
    let msg = query.msg.unwrap_or_default();
    let broker = state.broker.clone();

    let reply = match tokio::task::spawn_blocking(move || broker.post(&folder, &msg)).await {
        Ok(Ok(record)) => Reply::Posted(record.timestamp),
        Ok(Err(e)) => {
            debug!(error = %e, "post rejected");
            Reply::Rejected
        }
        Err(e) => {
            error!(error = %e, "post task failed");
            Reply::Rejected
        }
    };
    reply.to_string()
}

async fn health() -> &'static str {
    "ok"
}
