// src/poll/repository.rs
use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{storage_error, AppResult};
use crate::models::{NewPoll, Poll, PollOption, PollVote, VoteOutcome, Voter};

/// Storage operations behind the poll service.
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// All polls, or only those created by `owner`.
    async fn list_polls(&self, owner: Option<i32>) -> AppResult<Vec<Poll>>;

    /// Inserts the poll and all of its options atomically; returns the poll id.
    async fn create_poll(&self, poll: &NewPoll, options: &[String], owner: i32) -> AppResult<i32>;

    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<Poll>>;

    async fn list_options(&self, poll_id: i32) -> AppResult<Vec<PollOption>>;

    async fn find_option(&self, option_id: i32) -> AppResult<Option<PollOption>>;

    /// Records the vote unless the user already voted on any option of the
    /// poll. The check and the insert must be atomic.
    async fn record_vote(&self, user_id: i32, poll_id: i32, option_id: i32)
        -> AppResult<VoteOutcome>;

    /// Votes of a poll joined with voter identity and option text.
    async fn list_votes(&self, poll_id: i32) -> AppResult<Vec<PollVote>>;

    /// Sets the open/closed status; returns the number of rows affected.
    async fn set_status(&self, poll_id: i32, open: bool) -> AppResult<u64>;
}

const POLL_COLUMNS: &str =
    "id, title, description, status, user_id, created_at, updated_at, ended_at";

#[derive(Debug, Clone)]
pub struct PgPollRepository {
    pool: PgPool,
}

impl PgPollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: i32,
    user_id: i32,
    user_name: String,
    user_email: String,
    option_id: i32,
    option_text: String,
    poll_id: i32,
}

impl From<VoteRow> for PollVote {
    fn from(row: VoteRow) -> Self {
        PollVote {
            id: row.id,
            user: Voter {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            option: PollOption {
                id: row.option_id,
                text: row.option_text,
                poll_id: row.poll_id,
            },
        }
    }
}

#[async_trait]
impl PollRepository for PgPollRepository {
    async fn list_polls(&self, owner: Option<i32>) -> AppResult<Vec<Poll>> {
        let sql = format!(
            "SELECT {POLL_COLUMNS} FROM poll WHERE ($1::INT IS NULL OR user_id = $1) ORDER BY id"
        );
        sqlx::query_as::<_, Poll>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("error while querying polls table"))
    }

    async fn create_poll(&self, poll: &NewPoll, options: &[String], owner: i32) -> AppResult<i32> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("error while starting poll transaction"))?;

        let poll_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO poll (title, description, user_id, status, ended_at)
            VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN NULL ELSE now() END)
            RETURNING id
            "#,
        )
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(owner)
        .bind(poll.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error("error while inserting into poll table"))?;

        sqlx::query("INSERT INTO option (text, poll_id) SELECT text, $2 FROM UNNEST($1::TEXT[]) AS text")
            .bind(options)
            .bind(poll_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("error while batch inserting poll options"))?;

        tx.commit()
            .await
            .map_err(storage_error("error while committing poll transaction"))?;

        Ok(poll_id)
    }

    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<Poll>> {
        let sql = format!("SELECT {POLL_COLUMNS} FROM poll WHERE id = $1");
        sqlx::query_as::<_, Poll>(&sql)
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("error while querying poll by id"))
    }

    async fn list_options(&self, poll_id: i32) -> AppResult<Vec<PollOption>> {
        sqlx::query_as::<_, PollOption>(
            "SELECT id, text, poll_id FROM option WHERE poll_id = $1 ORDER BY id",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("error while querying options for poll"))
    }

    async fn find_option(&self, option_id: i32) -> AppResult<Option<PollOption>> {
        sqlx::query_as::<_, PollOption>("SELECT id, text, poll_id FROM option WHERE id = $1")
            .bind(option_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("error while querying option by id"))
    }

    async fn record_vote(
        &self,
        user_id: i32,
        poll_id: i32,
        option_id: i32,
    ) -> AppResult<VoteOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("error while starting vote transaction"))?;

        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vote
            WHERE user_id = $1
              AND option_id IN (SELECT id FROM option WHERE poll_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(poll_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error("error while checking for an existing vote"))?;

        if existing > 0 {
            // Dropping the transaction rolls it back.
            return Ok(VoteOutcome::AlreadyVoted);
        }

        // The unique (user_id, poll_id) constraint settles a concurrent vote
        // that passed the count above.
        let inserted = sqlx::query(
            r#"
            INSERT INTO vote (user_id, option_id, poll_id)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT vote_one_per_user_per_poll DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(option_id)
        .bind(poll_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("error while inserting into vote table"))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(storage_error("error while committing vote transaction"))?;

        Ok(if inserted == 1 {
            VoteOutcome::Recorded
        } else {
            VoteOutcome::AlreadyVoted
        })
    }

    async fn list_votes(&self, poll_id: i32) -> AppResult<Vec<PollVote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT v.id, u.id AS user_id, u.name AS user_name, u.email AS user_email,
                   o.id AS option_id, o.text AS option_text, o.poll_id
            FROM vote AS v
            JOIN "User" AS u ON v.user_id = u.id
            JOIN option AS o ON v.option_id = o.id
            WHERE o.poll_id = $1
            ORDER BY v.id
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("error while querying votes for poll"))?;

        Ok(rows.into_iter().map(PollVote::from).collect())
    }

    async fn set_status(&self, poll_id: i32, open: bool) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE poll
            SET status = $1,
                updated_at = now(),
                ended_at = CASE WHEN $1 THEN NULL ELSE now() END
            WHERE id = $2
            "#,
        )
        .bind(open)
        .bind(poll_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("error while updating poll status"))?;

        Ok(result.rows_affected())
    }
}
