pub mod auth;
pub mod error;
pub mod interests;
pub mod matches;
pub mod matching;
pub mod messages;
pub mod middleware;
pub mod skills;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, AppStateInner};

/// Build the full HTTP surface. Everything except registration, login and
/// the health probe sits behind `require_auth`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/user",
            get(users::get_me).patch(users::update_me).delete(users::delete_me),
        )
        .route("/skills", get(skills::list_skills).post(skills::create_skill))
        .route(
            "/interests",
            get(interests::list_interests).post(interests::declare_interest),
        )
        .route(
            "/interests/{interest_id}",
            get(interests::get_interest)
                .put(interests::update_interest)
                .delete(interests::delete_interest),
        )
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}", delete(matches::delete_match))
        .route(
            "/matches/{match_id}/messages",
            get(messages::list_messages).post(messages::post_message),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
