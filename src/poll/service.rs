// src/poll/service.rs
//! Poll business rules: one vote per user per poll, results only after
//! closing, and status changes only by the poll's creator.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{NewPoll, Poll, PollOption, PollVote, VoteOutcome};
use crate::poll::repository::PollRepository;

const MIN_OPTIONS: usize = 2;

#[derive(Clone)]
pub struct PollService {
    repo: Arc<dyn PollRepository>,
    reject_duplicate_votes: bool,
}

impl PollService {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self {
            repo,
            reject_duplicate_votes: false,
        }
    }

    /// Turns a repeated vote into `DuplicateVote` instead of an
    /// "already voted" message.
    pub fn with_duplicate_rejection(mut self, reject: bool) -> Self {
        self.reject_duplicate_votes = reject;
        self
    }

    pub async fn list_polls(&self, owner: Option<i32>) -> AppResult<Vec<Poll>> {
        self.repo.list_polls(owner).await
    }

    pub async fn create_poll(
        &self,
        mut poll: NewPoll,
        options: Vec<String>,
        owner: i32,
    ) -> AppResult<i32> {
        poll.title = poll.title.trim().to_string();
        if poll.title.is_empty() {
            return Err(AppError::bad_request("poll title is required"));
        }

        let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
        if options.iter().any(String::is_empty) {
            return Err(AppError::bad_request("poll options must not be blank"));
        }
        if options.len() < MIN_OPTIONS {
            return Err(AppError::bad_request(format!(
                "a poll needs at least {} options",
                MIN_OPTIONS
            )));
        }

        let poll_id = self.repo.create_poll(&poll, &options, owner).await?;
        tracing::info!(poll_id, owner, options = options.len(), "poll created");
        Ok(poll_id)
    }

    pub async fn get_poll(&self, poll_id: i32) -> AppResult<Poll> {
        self.repo
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("poll {}", poll_id)))
    }

    pub async fn get_poll_options(&self, poll_id: i32) -> AppResult<Vec<PollOption>> {
        self.get_poll(poll_id).await?;
        self.repo.list_options(poll_id).await
    }

    /// Records a vote. A second vote by the same user on the same poll, for
    /// any option, yields `VoteOutcome::AlreadyVoted` (or `DuplicateVote`
    /// when rejection is enabled) and leaves the stored votes unchanged.
    pub async fn cast_vote(
        &self,
        option_id: i32,
        user_id: i32,
        poll_id: i32,
    ) -> AppResult<VoteOutcome> {
        let poll = self.get_poll(poll_id).await?;
        if !poll.is_open() {
            return Err(AppError::bad_request("poll has ended"));
        }

        match self.repo.find_option(option_id).await? {
            Some(option) if option.poll_id == poll_id => {}
            _ => {
                return Err(AppError::not_found(format!(
                    "option {} of poll {}",
                    option_id, poll_id
                )))
            }
        }

        let outcome = self.repo.record_vote(user_id, poll_id, option_id).await?;
        match outcome {
            VoteOutcome::Recorded => {
                tracing::info!(poll_id, user_id, option_id, "vote recorded");
            }
            VoteOutcome::AlreadyVoted => {
                tracing::info!(poll_id, user_id, "vote has already been made by the user");
                if self.reject_duplicate_votes {
                    return Err(AppError::DuplicateVote);
                }
            }
        }
        Ok(outcome)
    }

    /// Votes are only visible once the poll is closed.
    pub async fn get_poll_votes(&self, poll_id: i32) -> AppResult<Vec<PollVote>> {
        let poll = self.get_poll(poll_id).await?;
        if poll.is_open() {
            return Err(AppError::bad_request("poll has not ended"));
        }
        self.repo.list_votes(poll_id).await
    }

    pub async fn update_poll(&self, poll_id: i32, user_id: i32, open: bool) -> AppResult<()> {
        let poll = self.get_poll(poll_id).await?;
        if poll.user_id != user_id {
            tracing::warn!(poll_id, user_id, "status change attempted by a non-owner");
            return Err(AppError::NotPollOwner);
        }

        let affected = self.repo.set_status(poll_id, open).await?;
        if affected != 1 {
            return Err(AppError::internal(format!(
                "status update of poll {} affected {} rows",
                poll_id, affected
            )));
        }

        tracing::info!(poll_id, open, "poll status updated");
        Ok(())
    }
}

impl std::fmt::Debug for PollService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollService")
            .field("reject_duplicate_votes", &self.reject_duplicate_votes)
            .finish_non_exhaustive()
    }
}
