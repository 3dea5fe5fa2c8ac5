// src/telemetry.rs
//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NOISY_CRATES: &str = "sqlx=warn,hyper=warn,tower_http=info";

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`;
/// `LOG_FORMAT=compact` selects the compact formatter.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", default_level, NOISY_CRATES)));

    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
    let compact = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("compact"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if compact {
        registry
            .with(fmt::layer().compact().with_target(false).with_ansi(is_terminal))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_ansi(is_terminal))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
