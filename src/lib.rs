use std::io;

use axum::{http::StatusCode, routing::get_service, Router};
use deadpool::managed::Pool;
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use tower_http::services::ServeDir;

pub mod access;
pub mod api;
pub mod auth;
pub mod error;
pub mod hierarchy;
pub mod media;
pub mod models;
pub mod schema;
pub mod validation;
pub mod visibility;
pub mod workflow;

pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Builds the pool without opening a connection; the first checkout does.
pub fn connect_to_db(db_url: &str) -> anyhow::Result<DbPool> {
    let db_config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    Pool::builder(db_config)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build database pool: {e}"))
}

/// The JSON API under `/api` and stored media under `/storage`.
pub fn app(media_root: &str) -> Router {
    let serve = get_service(ServeDir::new(media_root)).handle_error(handle_error);
    Router::new()
        .nest("/api", api::app())
        .nest("/storage", serve)
}

async fn handle_error(err: io::Error) -> error::AppError {
    tracing::warn!(error = %err, "failed to serve media");
    error::AppError::from(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch media")
}
