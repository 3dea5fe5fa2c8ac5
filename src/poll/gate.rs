// src/poll/gate.rs
//! Bearer-token gate in front of every poll-service route.
//!
//! Per request, stopping at the first match:
//! 1. no `Authorization` header -> `BadRequest`
//! 2. header not exactly `Bearer <token>` -> `BadRequest`
//! 3. token sent to the auth service; a failed call -> its mapped error
//! 4. auth service says unauthorized -> `InvalidCredentials`
//! 5. otherwise the request reaches the inner service unchanged
//!
//! Nothing is kept between requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{header, HeaderMap, Request};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::poll::client::AuthClient;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Clone)]
pub struct RequestGateLayer {
    client: Arc<dyn AuthClient>,
}

impl RequestGateLayer {
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        Self { client }
    }
}

impl<S> Layer<S> for RequestGateLayer {
    type Service = RequestGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestGate {
            inner,
            client: self.client.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestGate<S> {
    inner: S,
    client: Arc<dyn AuthClient>,
}

impl<S> Service<Request<Body>> for RequestGate<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let client = self.client.clone();
        // Use the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = tracing::info_span!(
            "request_gate",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let token = match bearer_token(req.headers()) {
                    Ok(token) => token.to_owned(),
                    Err(e) => return Ok(e.into_response()),
                };

                match client.verify_token(&token).await {
                    Ok(true) => inner.call(req).await,
                    Ok(false) => {
                        tracing::debug!("token not authorized");
                        Ok(AppError::InvalidCredentials.into_response())
                    }
                    Err(e) => Ok(e.into_response()),
                }
            }
            .instrument(span),
        )
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::bad_request("missing authorization header"))?;

    let value = value
        .to_str()
        .map_err(|_| AppError::bad_request("malformed authorization header"))?;

    match value.split_once(' ') {
        Some((BEARER_SCHEME, token))
            if !token.is_empty() && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => Err(AppError::bad_request("malformed authorization header")),
    }
}
