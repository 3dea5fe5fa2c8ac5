// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A poll row. `status` is `true` while the poll accepts votes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub status: bool,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn is_open(&self) -> bool {
        self.status
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: i32,
    pub text: String,
    pub poll_id: i32,
}

/// Poll fields supplied by the client on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPoll {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "open_by_default")]
    pub status: bool,
}

fn open_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voter {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// A recorded vote joined with the voter's identity and the chosen option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVote {
    pub id: i32,
    pub user: Voter,
    pub option: PollOption,
}

/// Result of an atomic check-and-insert of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
}

impl VoteOutcome {
    pub const RECORDED_MESSAGE: &'static str = "Your vote has been recorded successfully";
    pub const ALREADY_VOTED_MESSAGE: &'static str = "You have already made a vote";

    pub fn message(self) -> &'static str {
        match self {
            VoteOutcome::Recorded => Self::RECORDED_MESSAGE,
            VoteOutcome::AlreadyVoted => Self::ALREADY_VOTED_MESSAGE,
        }
    }
}

/// A stored account. The hash never leaves the auth service.
#[derive(Clone, sqlx::FromRow)]
pub struct Credential {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Registration candidate.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /verify`, shared by the auth handler and the poll-side client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_authorized: bool,
}
