// src/poll/client.rs
//! Poll-service side of the token verification protocol.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use crate::error::{AppError, AppResult};
use crate::models::{VerifyRequest, VerifyResponse};

/// Asks the authentication service whether a bearer token is valid.
///
/// Called once per protected request with no caching. Implementations must
/// not retry: a failed call fails the request.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn verify_token(&self, token: &str) -> AppResult<bool>;
}

/// `AuthClient` over HTTP against the auth service's `/verify` endpoint.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpAuthClient {
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn verify_token(&self, token: &str) -> AppResult<bool> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&VerifyRequest {
                token: token.to_owned(),
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, url = %self.verify_url, "error while calling auth service");
                AppError::internal("authentication service unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status));
        }

        let body: VerifyResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "error while decoding verify response from auth service");
            AppError::internal("unreadable response from authentication service")
        })?;

        Ok(body.is_authorized)
    }
}

/// Maps a non-2xx status from the auth service onto a local error kind.
pub fn error_for_status(status: StatusCode) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::bad_request("malformed token"),
        StatusCode::UNAUTHORIZED => AppError::InvalidCredentials,
        other => AppError::internal(format!("authentication service returned {}", other)),
    }
}
