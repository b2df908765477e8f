use rapmap_api::app;
use rapmap_api::config;
use rapmap_api::database::manager::DatabaseManager;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting RapMap API in {:?} mode", config.environment);

    // Migrations need a reachable database; a failure here is logged and
    // the server still starts so /health can report the degraded state.
    if let Err(e) = DatabaseManager::migrate().await {
        tracing::error!("Migrations did not run: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("RAPMAP_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("RapMap API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
