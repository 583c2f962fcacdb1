use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers::{auth, comments, features, phones, reviews, users};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Full application router: service endpoints plus the versioned API
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(API_PREFIX, api_routes(state.clone()))
        .layer(TraceLayer::new_for_http());

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security));
    }

    router.with_state(state)
}

/// The token check is a `route_layer` on each protected method router, so an
/// unsupported method still answers 405 and public methods on the same path stay open.
fn api_routes(state: AppState) -> Router<AppState> {
    let require_token = middleware::from_fn_with_state(state, jwt_auth_middleware);

    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me).route_layer(require_token.clone()))
        .route("/auth/change-password/:id", put(auth::change_password))
        // Users
        .route("/users/:id", get(users::get_user).route_layer(require_token.clone()))
        .route(
            "/users/:id/profile",
            put(users::update_profile).route_layer(require_token.clone()),
        )
        // Phones and features
        .route(
            "/phones",
            get(phones::list_phones).merge(post(phones::create_phone).route_layer(require_token.clone())),
        )
        .route(
            "/phones/:id",
            get(phones::get_phone).merge(
                put(phones::update_phone)
                    .delete(phones::delete_phone)
                    .route_layer(require_token.clone()),
            ),
        )
        .route("/phones/:id/reviews", get(phones::list_phone_reviews))
        .route(
            "/phones/:id/features",
            post(features::create_feature).route_layer(require_token.clone()),
        )
        .route(
            "/phones/:id/features/:feature_id",
            put(features::update_feature)
                .delete(features::delete_feature)
                .route_layer(require_token.clone()),
        )
        // Reviews
        .route(
            "/reviews",
            get(reviews::list_reviews).merge(post(reviews::create_review).route_layer(require_token.clone())),
        )
        .route(
            "/reviews/:id",
            get(reviews::get_review).merge(
                put(reviews::update_review)
                    .delete(reviews::delete_review)
                    .route_layer(require_token.clone()),
            ),
        )
        // Comments
        .route(
            "/comments",
            post(comments::create_comment).route_layer(require_token.clone()),
        )
        .route(
            "/comments/:id",
            get(comments::list_comments)
                .put(comments::update_comment)
                .delete(comments::delete_comment)
                .route_layer(require_token),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(origins)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Phone Review API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Accounts, phones, features, reviews and comments",
        "endpoints": {
            "auth": "/api/v1/auth/{register,login,me,change-password/:id}",
            "users": "/api/v1/users/:id[/profile] (protected)",
            "phones": "/api/v1/phones[/:id[/features[/:feature_id]|/reviews]]",
            "reviews": "/api/v1/reviews[/:id]",
            "comments": "/api/v1/comments[/:id] (protected)",
            "health": "/health",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
        }
    }
}
