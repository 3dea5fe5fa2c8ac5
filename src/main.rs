// src/main.rs
use std::process::ExitCode;
use std::sync::Arc;

use poll_app::config::{self, PollServiceConfig};
use poll_app::poll::{HttpAuthClient, PgPollRepository, PollService};
use poll_app::{db, routes, server, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    config::load_dotenv();
    telemetry::init_tracing("info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "poll service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = PollServiceConfig::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let service = PollService::new(Arc::new(PgPollRepository::new(pool)))
        .with_duplicate_rejection(config.reject_duplicate_votes);
    let auth_client = HttpAuthClient::new(config.auth_verify_url.clone(), config.auth_timeout)?;
    tracing::info!(verify_url = %auth_client.verify_url(), "using authentication service");

    let router = routes::poll_routes(service, Arc::new(auth_client));
    server::serve(router, &config.server, "poll-service").await?;
    Ok(())
}
