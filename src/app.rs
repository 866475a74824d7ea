//! Router assembly.

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ApiConfig, SecurityConfig};
use crate::handlers::{protected, public, AppState};
use crate::middleware::session_middleware;

/// Build the full application router with the configured layers.
pub fn app(state: AppState) -> Router {
    let config = crate::config::config();
    build(state, &config.api, &config.security)
}

pub fn build(state: AppState, api: &ApiConfig, security: &SecurityConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(question_routes())
        .merge(answer_routes())
        .merge(vote_routes())
        .merge(collection_routes())
        .merge(user_routes())
        // Every route sees the resolved session (or none)
        .layer(axum::middleware::from_fn(session_middleware))
        .with_state(state);

    if let Some(cors) = cors_layer(security) {
        router = router.layer(cors);
    }
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/api/questions", post(protected::questions::question_post))
        .route(
            "/api/questions/:id",
            get(public::question_get)
                .put(protected::questions::question_put)
                .delete(protected::questions::question_delete),
        )
        .route(
            "/api/questions/:id/answers",
            get(public::answers_get).post(protected::answers::answer_post),
        )
}

fn answer_routes() -> Router<AppState> {
    Router::new().route("/api/answers/:id", delete(protected::answers::answer_delete))
}

fn vote_routes() -> Router<AppState> {
    Router::new()
        .route("/api/votes", post(protected::votes::vote_post))
        .route("/api/votes/:target_type/:target_id", get(protected::votes::vote_get))
}

fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collections", get(protected::collections::collection_list))
        .route(
            "/api/collections/:question_id",
            get(protected::collections::collection_get).post(protected::collections::collection_post),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users/me", put(protected::users::me_put))
}

/// Permissive when no origins are configured, otherwise restricted to the list.
fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
