use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use alphabots_server::config::Config;
use alphabots_server::db::{postgres, PgStore};
use alphabots_server::routes::create_routes;
use alphabots_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().expect("Invalid configuration");

    let pool = postgres::connect(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    postgres::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let addr = config.bind_addr;
    let state = AppState::new(config, Arc::new(PgStore::new(pool)));
    let app = create_routes(state);

    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
