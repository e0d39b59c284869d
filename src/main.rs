use axum::{http::Method, Extension};
use club_registry::{auth::ensure_jwt_secret_is_valid, connect_to_db};
use envconfig::Envconfig;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

#[derive(Envconfig)]
struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub db_url: String,
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,
    #[envconfig(from = "MEDIA_ROOT", default = "storage")]
    pub media_root: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("club_registry=info,tower_http=info")),
        )
        .init();

    let config = Config::init_from_env()?;
    ensure_jwt_secret_is_valid();

    let pool = connect_to_db(&config.db_url)?;
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any);
    let app = club_registry::app(&config.media_root)
        .layer(Extension(pool))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = ([0, 0, 0, 0], config.port).into();
    tracing::info!(%addr, media_root = %config.media_root, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
