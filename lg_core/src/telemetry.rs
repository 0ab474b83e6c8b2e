//! ABOUTME: Tracing subscriber setup for the exporter binary and tests
//! ABOUTME: JSON lines in production, human-readable output everywhere else

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "info,actix_server=warn";

pub fn is_production(env: &str) -> bool {
    env.eq_ignore_ascii_case("production")
}

/// Install the global subscriber; later calls are no-ops
pub fn init_tracing(env: &str, service: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let production = is_production(env);

        let json = production.then(|| fmt::layer().json().with_current_span(true));
        let pretty = (!production).then(|| fmt::layer().pretty());

        // A subscriber already installed by a test harness is left in place
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(json)
            .with(pretty)
            .try_init();

        if installed.is_ok() {
            tracing::info!(service, environment = env, "Tracing initialized");
        }
    });
}
