// src/auth/token.rs
//! Signed, claim-bearing tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::{AppError, AppResult};
use crate::models::Credential;

/// The only algorithm tokens are signed with or accepted under.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Longest accepted token lifetime (one year).
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Missing("AUTH_TOKEN_SECRET"));
        }
        if self.ttl.is_zero() || self.ttl > MAX_TTL {
            return Err(ConfigError::Invalid {
                key: "AUTH_TOKEN_TTL_SECS",
                value: self.ttl.as_secs().to_string(),
            });
        }
        if self.secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!("token secret is shorter than {} bytes", RECOMMENDED_SECRET_LEN);
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Payload embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub name: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

impl Claims {
    pub fn new(credential: &Credential, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            id: credential.id,
            email: credential.email.clone(),
            name: credential.name.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
        }
    }
}

/// Creates and checks tokens. Implementations own their key material; callers
/// can never supply a secret.
pub trait TokenCodec: Send + Sync {
    /// Signs the claims. Fails only on an internal serialization error.
    fn issue(&self, claims: &Claims) -> AppResult<String>;

    /// Fails `BadRequest` when the token cannot be parsed at all, and
    /// `InvalidCredentials` when its signature, algorithm or claims are bad.
    fn verify(&self, token: &str) -> AppResult<Claims>;

    /// Lifetime given to newly issued tokens.
    fn ttl(&self) -> Duration;
}

/// HS256 JSON Web Token codec.
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCodec {
    pub fn new(config: &TokenConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        // Validation::new pins the accepted algorithm list to exactly one entry.
        let validation = Validation::new(TOKEN_ALGORITHM);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
        })
    }
}

impl TokenCodec for JwtCodec {
    fn issue(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                match e.kind() {
                    ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                        AppError::bad_request("malformed token")
                    }
                    _ => AppError::InvalidCredentials,
                }
            })
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-testing";

    fn codec(secret: &str) -> JwtCodec {
        JwtCodec::new(&TokenConfig::new(secret)).unwrap()
    }

    fn credential() -> Credential {
        Credential {
            id: 42,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let codec = codec(SECRET);
        let claims = Claims::new(&credential(), codec.ttl());

        let token = codec.issue(&claims).unwrap();
        let verified = codec.verify(&token).unwrap();

        assert_eq!(verified, claims);
        assert_eq!(verified.id, 42);
    }

    #[test]
    fn test_wrong_secret_is_invalid_credentials() {
        let issuer = codec("secret-one-for-testing-purposes-only");
        let verifier = codec("secret-two-for-testing-purposes-only");

        let token = issuer
            .issue(&Claims::new(&credential(), issuer.ttl()))
            .unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        let codec = codec(SECRET);
        let claims = Claims::new(&credential(), codec.ttl());

        // Same secret, different HMAC variant.
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec.verify(&token), Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec(SECRET);
        let mut claims = Claims::new(&credential(), codec.ttl());
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;

        let token = codec.issue(&claims).unwrap();

        assert!(matches!(codec.verify(&token), Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn test_unparsable_token_is_bad_request() {
        let codec = codec(SECRET);

        assert!(matches!(codec.verify("garbage"), Err(AppError::BadRequest(_))));
        assert!(matches!(codec.verify(""), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(JwtCodec::new(&TokenConfig::new("")).is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(TokenConfig::new(SECRET).with_ttl(Duration::ZERO).validate().is_err());
        assert!(TokenConfig::new(SECRET).with_ttl(MAX_TTL).validate().is_ok());
        assert!(TokenConfig::new(SECRET)
            .with_ttl(MAX_TTL + Duration::from_secs(1))
            .validate()
            .is_err());
    }

    #[test]
    fn test_huge_ttl_saturates_expiry() {
        let claims = Claims::new(&credential(), Duration::from_secs(u64::MAX));
        assert_eq!(claims.exp, i64::MAX);

        let claims = Claims::new(&credential(), Duration::from_secs(i64::MAX as u64));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let rendered = format!("{:?}", TokenConfig::new(SECRET));
        assert!(!rendered.contains(SECRET));
    }
}
