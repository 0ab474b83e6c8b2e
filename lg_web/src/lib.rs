//! ABOUTME: Web layer serving the scrape endpoint and the OAuth callback
//! ABOUTME: Mounts the observability routes next to the index and /auth pages

use actix_web::{web, App, HttpServer};
use lg_auth::OAuthCredentialProvider;
use lg_core::{Error, Result};
use lg_obs::ObsState;
use std::sync::Arc;

pub mod routes;

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct WebState {
    pub auth: Arc<OAuthCredentialProvider>,
    pub obs: ObsState,
}

impl WebState {
    pub fn new(auth: Arc<OAuthCredentialProvider>, obs: ObsState) -> Self {
        Self { auth, obs }
    }
}

/// Create the web application service factory
pub fn create_app(
    state: WebState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let obs = state.obs.clone();

    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::Data::new(obs))
        .wrap(actix_web::middleware::Logger::default())
        .configure(lg_obs::configure)
        .configure(routes::configure)
}

/// Start the web server; returns when the server shuts down
pub async fn start_server(bind_addr: &str, state: WebState) -> Result<()> {
    tracing::info!("Starting web server on {}", bind_addr);

    HttpServer::new(move || create_app(state.clone()))
        .bind(bind_addr)
        .map_err(|e| Error::Config(format!("Failed to bind web server: {}", e)))?
        .run()
        .await
        .map_err(|e| Error::Config(format!("Web server error: {}", e)))?;

    Ok(())
}
