// src/poll/handlers.rs
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppJson, AppPath, AppQuery, AppResult};
use crate::models::NewPoll;
use crate::poll::service::PollService;

#[derive(Debug, Deserialize)]
pub struct ListPollsQuery {
    pub user_id: Option<String>,
}

impl ListPollsQuery {
    /// A missing, non-numeric or zero `user_id` means "all polls".
    fn owner(&self) -> Option<i32> {
        self.user_id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .filter(|id| *id != 0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub poll: NewPoll,
    pub poll_options: Vec<String>,
    pub user_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub user_id: i32,
    pub status: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub poll_id: i32,
    pub poll_option_id: i32,
}

/// `GET /polls?user_id=`
pub async fn list_polls(
    State(polls): State<PollService>,
    AppQuery(query): AppQuery<ListPollsQuery>,
) -> AppResult<Json<Value>> {
    let polls = polls.list_polls(query.owner()).await?;
    Ok(Json(json!({ "polls": polls })))
}

/// `POST /polls`
pub async fn create_poll(
    State(polls): State<PollService>,
    AppJson(request): AppJson<CreatePollRequest>,
) -> AppResult<Json<Value>> {
    polls
        .create_poll(request.poll, request.poll_options, request.user_id)
        .await?;
    Ok(Json(json!({ "message": "Poll was created successfully" })))
}

/// `GET /polls/{id}`
pub async fn get_poll(
    State(polls): State<PollService>,
    AppPath(poll_id): AppPath<i32>,
) -> AppResult<Json<Value>> {
    let poll = polls.get_poll(poll_id).await?;
    Ok(Json(json!({ "poll": poll })))
}

/// `GET /polls/{id}/options`
pub async fn get_poll_options(
    State(polls): State<PollService>,
    AppPath(poll_id): AppPath<i32>,
) -> AppResult<Json<Value>> {
    let options = polls.get_poll_options(poll_id).await?;
    Ok(Json(json!({ "pollOptions": options })))
}

/// `GET /polls/{id}/votes`
pub async fn get_poll_votes(
    State(polls): State<PollService>,
    AppPath(poll_id): AppPath<i32>,
) -> AppResult<Json<Value>> {
    let votes = polls.get_poll_votes(poll_id).await?;
    Ok(Json(json!({ "pollVotes": votes })))
}

/// `PUT /polls/{id}`
pub async fn update_poll(
    State(polls): State<PollService>,
    AppPath(poll_id): AppPath<i32>,
    AppJson(request): AppJson<UpdatePollRequest>,
) -> AppResult<Json<Value>> {
    polls
        .update_poll(poll_id, request.user_id, request.status)
        .await?;
    Ok(Json(json!({})))
}

/// `POST /users/{id}/votes`
pub async fn cast_vote(
    State(polls): State<PollService>,
    AppPath(user_id): AppPath<i32>,
    AppJson(request): AppJson<CastVoteRequest>,
) -> AppResult<Json<Value>> {
    let outcome = polls
        .cast_vote(request.poll_option_id, user_id, request.poll_id)
        .await?;
    Ok(Json(json!({ "message": outcome.message() })))
}
