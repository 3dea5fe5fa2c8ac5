// src/auth/handlers.rs
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::credentials::CredentialStore;
use crate::auth::token::{Claims, TokenCodec};
use crate::error::{AppJson, AppResult};
use crate::models::{Login, NewUser, VerifyRequest, VerifyResponse};

/// State shared by the authentication service handlers.
#[derive(Clone)]
pub struct AuthState {
    pub credentials: CredentialStore,
    pub codec: Arc<dyn TokenCodec>,
}

impl AuthState {
    pub fn new(credentials: CredentialStore, codec: Arc<dyn TokenCodec>) -> Self {
        Self { credentials, codec }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user: NewUser,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: Login,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /register`
pub async fn register(
    State(state): State<AuthState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<Json<Value>> {
    state.credentials.register(request.user).await?;
    Ok(Json(json!({})))
}

/// `POST /login`
pub async fn login(
    State(state): State<AuthState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let credential = state
        .credentials
        .login(&request.login.email, &request.login.password)
        .await?;

    let claims = Claims::new(&credential, state.codec.ttl());
    let token = state.codec.issue(&claims)?;

    tracing::info!(user_id = credential.id, "token issued");
    Ok(Json(LoginResponse { token }))
}

/// `POST /verify`
pub async fn verify(
    State(state): State<AuthState>,
    AppJson(request): AppJson<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let claims = state.codec.verify(&request.token)?;
    tracing::debug!(user_id = claims.id, "token verified");
    Ok(Json(VerifyResponse {
        is_authorized: true,
    }))
}
