// src/bin/auth_service.rs
use std::process::ExitCode;
use std::sync::Arc;

use poll_app::auth::{AuthState, CredentialStore, JwtCodec, PgUserRepository};
use poll_app::config::{self, AuthServiceConfig};
use poll_app::{db, routes, server, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    config::load_dotenv();
    telemetry::init_tracing("info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "auth service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthServiceConfig::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let codec = JwtCodec::new(&config.token)?;
    let credentials = CredentialStore::new(Arc::new(PgUserRepository::new(pool)), config.bcrypt_cost);
    let state = AuthState::new(credentials, Arc::new(codec));

    server::serve(routes::auth_routes(state), &config.server, "auth-service").await?;
    Ok(())
}
