pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{middleware::from_fn, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Assemble the full router: public tier, then the JWT-protected tier,
/// then global layers.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::public;

    Router::new()
        // Musician submissions (anonymous allowed)
        .route("/requests", post(public::requests::submit))
        // Public directory and articles
        .route("/rappers", get(public::directory::list))
        .route("/rappers/:id", get(public::directory::get))
        .route("/blogs", get(public::blogs::list))
        .route("/blogs/:slug", get(public::blogs::get))
        // Identity Gateway webhook (shared-secret auth, not JWT)
        .route("/auth/events", post(public::events::gateway_event))
}

fn protected_routes() -> Router {
    use axum::routing::{post, put};
    use handlers::protected;

    Router::new()
        // Moderation workflow
        .route("/api/requests", get(protected::requests::list))
        .route("/api/requests/:id/approve", post(protected::requests::approve))
        .route("/api/requests/:id/reject", post(protected::requests::reject))
        // Role management
        .route("/api/users/:id", put(protected::users::set_role))
        // Caller profile
        .route("/api/auth/whoami", get(protected::auth::whoami))
        // Directory administration
        .route("/api/rappers", post(protected::directory::create))
        .route(
            "/api/rappers/:id",
            put(protected::directory::update).delete(protected::directory::delete),
        )
        // Authored articles
        .route(
            "/api/blogs",
            get(protected::blogs::list_own).post(protected::blogs::create),
        )
        .route(
            "/api/blogs/:id",
            put(protected::blogs::update).delete(protected::blogs::delete),
        )
        .layer(from_fn(middleware::jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "RapMap API",
            "version": version,
            "description": "Musician directory backend with moderated submissions",
            "endpoints": {
                "home": "/ (public)",
                "submissions": "POST /requests (public)",
                "directory": "/rappers[/:id] (public)",
                "blogs": "/blogs[/:slug] (public)",
                "gateway": "POST /auth/events (webhook)",
                "moderation": "/api/requests[/:id/approve|reject] (protected, admin)",
                "roles": "PUT /api/users/:id (protected, admin)",
                "profile": "GET /api/auth/whoami (protected)",
                "admin_directory": "/api/rappers[/:id] (protected)",
                "authoring": "/api/blogs[/:id] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
