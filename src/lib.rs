// src/lib.rs
//! Polls with one vote per user, served by two cooperating services: the
//! poll service and the authentication service whose `/verify` endpoint
//! gates every poll request.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod poll;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use error::{AppError, AppResult};
