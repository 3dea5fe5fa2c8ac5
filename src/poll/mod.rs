// src/poll/mod.rs
//! Poll service: poll/option/vote operations behind the bearer-token gate.

pub mod client;
pub mod gate;
pub mod handlers;
pub mod repository;
pub mod service;

pub use client::{AuthClient, HttpAuthClient};
pub use gate::RequestGateLayer;
pub use repository::{PgPollRepository, PollRepository};
pub use service::PollService;
