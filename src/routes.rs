// src/routes.rs
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::handlers as auth;
use crate::auth::AuthState;
use crate::poll::handlers as polls;
use crate::poll::{AuthClient, PollService, RequestGateLayer};

/// Poll service routes. Every route, including unknown paths, sits behind
/// the request gate; CORS preflight is answered before it.
pub fn poll_routes(service: PollService, auth_client: Arc<dyn AuthClient>) -> Router {
    Router::new()
        .route("/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/polls/{id}", get(polls::get_poll).put(polls::update_poll))
        .route("/polls/{id}/options", get(polls::get_poll_options))
        .route("/polls/{id}/votes", get(polls::get_poll_votes))
        .route("/users/{id}/votes", post(polls::cast_vote))
        .layer(RequestGateLayer::new(auth_client))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Authentication service routes. None of them require a token.
pub fn auth_routes(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", post(auth::verify))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
