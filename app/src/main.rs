use lg_api::YouTubeClient;
use lg_auth::OAuthCredentialProvider;
use lg_config::Config;
use lg_core::telemetry;
use lg_obs::{MetricRegistry, ObsState};
use lg_poll::{PollCycle, PollScheduler};
use lg_web::WebState;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Load configuration - exit with non-zero if invalid
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing("development", "livegauge");
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    telemetry::init_tracing(&config.telemetry.environment, "livegauge");
    tracing::debug!(?config, "Configuration loaded successfully");
    tracing::info!(
        bind_addr = %config.server.bind_addr(),
        refresh_interval_secs = config.poll.refresh_interval_seconds,
        api_base_url = %config.api.base_url,
        "livegauge starting"
    );

    let call_timeout = Duration::from_secs(config.api.request_timeout_seconds);
    let metrics = Arc::new(MetricRegistry::new());

    let auth = match OAuthCredentialProvider::load(config.oauth.clone(), call_timeout).await {
        Ok(auth) => Arc::new(auth),
        Err(e) => {
            tracing::error!("Failed to initialize credentials: {}", e);
            process::exit(1);
        }
    };

    let client = match YouTubeClient::new(call_timeout) {
        Ok(client) => client.with_base_url(config.api.base_url.clone()),
        Err(e) => {
            tracing::error!("Failed to create platform client: {}", e);
            process::exit(1);
        }
    };

    let cycle = Arc::new(
        PollCycle::new(auth.clone(), Arc::new(client), metrics.clone())
            .with_call_timeout(call_timeout),
    );

    let scheduler = match PollScheduler::new(
        cycle,
        Duration::from_secs(config.poll.refresh_interval_seconds),
    )
    .await
    {
        Ok(scheduler) => Arc::new(scheduler),
        Err(e) => {
            tracing::error!("Failed to create poll scheduler: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = scheduler.start().await {
        tracing::error!("Failed to start poll scheduler: {}", e);
        process::exit(1);
    }

    // First cycle runs now rather than one interval from now
    let first = Arc::clone(&scheduler);
    tokio::spawn(async move {
        first.trigger_now().await;
    });

    let obs = ObsState::new(metrics, auth.clone());

    let web_state = WebState::new(auth, obs);
    let result = lg_web::start_server(&config.server.bind_addr(), web_state).await;

    if let Err(e) = scheduler.stop().await {
        tracing::warn!("Failed to stop poll scheduler: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }

    tracing::info!("livegauge stopped");
}
