// src/auth/credentials.rs
//! Registration and login on top of a narrow user repository.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::error::{storage_error, AppError, AppResult};
use crate::models::{Credential, NewUser};

/// Storage operations the credential store needs.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>>;

    /// Inserts a new account and returns its id. Must fail with
    /// `UserAlreadyExists` when the email is taken.
    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<i32>;
}

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        sqlx::query_as::<_, Credential>(
            r#"SELECT id, name, email, password FROM "User" WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("error while querying users table"))
    }

    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<i32> {
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"INSERT INTO "User" (name, email, password) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => Ok(id),
            // A concurrent registration may win between the lookup and the insert.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::UserAlreadyExists)
            }
            Err(e) => Err(storage_error("error while inserting into users table")(e)),
        }
    }
}

/// Registers users with bcrypt-hashed passwords and authenticates logins.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    cost: u32,
    // Verified against when the email is unknown, so both login failures
    // cost one bcrypt verification.
    dummy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserRepository>, cost: u32) -> Self {
        Self {
            users,
            cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn register(&self, candidate: NewUser) -> AppResult<i32> {
        validate_candidate(&candidate)?;

        if self.users.find_by_email(&candidate.email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let NewUser {
            name,
            email,
            password,
        } = candidate;
        let hash = hash_password(password, self.cost).await?;
        let id = self.users.insert(&name, &email, &hash).await?;

        tracing::info!(user_id = id, "user registered");
        Ok(id)
    }

    /// Returns the full credential record when the password matches.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Credential> {
        let Some(credential) = self.users.find_by_email(email).await? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| hash_password(DUMMY_PASSWORD.to_owned(), self.cost))
                .await?;
            verify_password(password.to_owned(), dummy.clone()).await?;
            tracing::debug!("login attempt for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if verify_password(password.to_owned(), credential.password_hash.clone()).await? {
            Ok(credential)
        } else {
            tracing::debug!(user_id = credential.id, "login attempt with wrong password");
            Err(AppError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

fn validate_candidate(candidate: &NewUser) -> AppResult<()> {
    if candidate.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if !candidate.email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if candidate.password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }
    Ok(())
}

// bcrypt runs on the blocking pool.

const DUMMY_PASSWORD: &str = "unknown-account";

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("error while hashing password: {}", e)))
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("password verification task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("stored password hash is unusable: {}", e)))
}
