//! In-memory fakes of the repository and client traits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;

use poll_app::auth::{CredentialStore, JwtCodec, TokenConfig, UserRepository};
use poll_app::error::{AppError, AppResult};
use poll_app::models::{Credential, NewPoll, Poll, PollOption, PollVote, VoteOutcome, Voter};
use poll_app::poll::{AuthClient, PollRepository};

pub const TEST_SECRET: &str = "test-secret-key-that-is-long-enough-for-testing";
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn test_codec() -> JwtCodec {
    JwtCodec::new(&TokenConfig::new(TEST_SECRET).with_ttl(Duration::from_secs(600))).unwrap()
}

pub fn test_credentials(users: Arc<InMemoryUserRepository>) -> CredentialStore {
    CredentialStore::new(users, TEST_BCRYPT_COST)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<Credential>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn stored_hash(&self, email: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.password_hash.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<i32> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::UserAlreadyExists);
        }
        let id = users.len() as i32 + 1;
        users.push(Credential {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        });
        Ok(id)
    }
}

// =============================================================================
// Polls
// =============================================================================

struct StoredVote {
    id: i32,
    user_id: i32,
    option_id: i32,
}

#[derive(Default)]
struct PollTables {
    polls: Vec<Poll>,
    options: Vec<PollOption>,
    votes: Vec<StoredVote>,
    voters: HashMap<i32, Voter>,
    next_id: i32,
}

impl PollTables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Poll storage whose vote check-and-insert runs under one lock.
#[derive(Default)]
pub struct InMemoryPollRepository {
    tables: Mutex<PollTables>,
    status_rows_affected: Mutex<Option<u64>>,
}

impl InMemoryPollRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_voter(&self, id: i32, name: &str, email: &str) {
        self.tables.lock().unwrap().voters.insert(
            id,
            Voter {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
    }

    /// Votes stored for `user_id` across all options of `poll_id`.
    pub fn vote_count(&self, user_id: i32, poll_id: i32) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .filter(|v| {
                tables
                    .options
                    .iter()
                    .any(|o| o.id == v.option_id && o.poll_id == poll_id)
            })
            .count()
    }

    pub fn option_id(&self, poll_id: i32, text: &str) -> i32 {
        self.tables
            .lock()
            .unwrap()
            .options
            .iter()
            .find(|o| o.poll_id == poll_id && o.text == text)
            .map(|o| o.id)
            .expect("option exists")
    }

    /// Forces `set_status` to report this row count.
    pub fn fake_status_rows_affected(&self, rows: u64) {
        *self.status_rows_affected.lock().unwrap() = Some(rows);
    }
}

#[async_trait]
impl PollRepository for InMemoryPollRepository {
    async fn list_polls(&self, owner: Option<i32>) -> AppResult<Vec<Poll>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .polls
            .iter()
            .filter(|p| owner.map_or(true, |owner| p.user_id == owner))
            .cloned()
            .collect())
    }

    async fn create_poll(&self, poll: &NewPoll, options: &[String], owner: i32) -> AppResult<i32> {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let poll_id = tables.next_id();
        tables.polls.push(Poll {
            id: poll_id,
            title: poll.title.clone(),
            description: poll.description.clone(),
            status: poll.status,
            user_id: owner,
            created_at: now,
            updated_at: now,
            ended_at: (!poll.status).then_some(now),
        });
        for text in options {
            let id = tables.next_id();
            tables.options.push(PollOption {
                id,
                text: text.clone(),
                poll_id,
            });
        }
        Ok(poll_id)
    }

    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<Poll>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .polls
            .iter()
            .find(|p| p.id == poll_id)
            .cloned())
    }

    async fn list_options(&self, poll_id: i32) -> AppResult<Vec<PollOption>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn find_option(&self, option_id: i32) -> AppResult<Option<PollOption>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .options
            .iter()
            .find(|o| o.id == option_id)
            .cloned())
    }

    async fn record_vote(
        &self,
        user_id: i32,
        poll_id: i32,
        option_id: i32,
    ) -> AppResult<VoteOutcome> {
        let mut tables = self.tables.lock().unwrap();
        let poll_options: Vec<i32> = tables
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .map(|o| o.id)
            .collect();
        let existing = tables
            .votes
            .iter()
            .filter(|v| v.user_id == user_id && poll_options.contains(&v.option_id))
            .count();
        if existing > 0 {
            return Ok(VoteOutcome::AlreadyVoted);
        }
        let id = tables.next_id();
        tables.votes.push(StoredVote {
            id,
            user_id,
            option_id,
        });
        Ok(VoteOutcome::Recorded)
    }

    async fn list_votes(&self, poll_id: i32) -> AppResult<Vec<PollVote>> {
        let tables = self.tables.lock().unwrap();
        let votes = tables
            .votes
            .iter()
            .filter_map(|v| {
                let option = tables
                    .options
                    .iter()
                    .find(|o| o.id == v.option_id && o.poll_id == poll_id)?;
                let user = tables.voters.get(&v.user_id)?;
                Some(PollVote {
                    id: v.id,
                    user: user.clone(),
                    option: option.clone(),
                })
            })
            .collect();
        Ok(votes)
    }

    async fn set_status(&self, poll_id: i32, open: bool) -> AppResult<u64> {
        if let Some(rows) = *self.status_rows_affected.lock().unwrap() {
            return Ok(rows);
        }
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let mut affected = 0;
        for poll in tables.polls.iter_mut().filter(|p| p.id == poll_id) {
            poll.status = open;
            poll.updated_at = now;
            poll.ended_at = if open { None } else { Some(now) };
            affected += 1;
        }
        Ok(affected)
    }
}

// =============================================================================
// Auth client
// =============================================================================

/// Accepts exactly one token; anything else is reported unauthorized.
pub struct SingleTokenAuthClient {
    pub valid_token: String,
}

#[async_trait]
impl AuthClient for SingleTokenAuthClient {
    async fn verify_token(&self, token: &str) -> AppResult<bool> {
        Ok(token == self.valid_token)
    }
}

/// Always fails the way an unreachable auth service does.
pub struct UnreachableAuthClient;

#[async_trait]
impl AuthClient for UnreachableAuthClient {
    async fn verify_token(&self, _token: &str) -> AppResult<bool> {
        Err(AppError::internal("authentication service unreachable"))
    }
}
