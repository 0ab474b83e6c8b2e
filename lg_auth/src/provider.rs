//! ABOUTME: Two-state OAuth credential provider (unauthorized / authorized)
//! ABOUTME: Only the authorization callback moves it to authorized

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lg_config::OAuthConfig;
use lg_core::{Credential, Error, Result};
use lg_obs::ReadinessCheck;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::token::{StoredToken, TokenErrorResponse, TokenResponse};

/// Refresh this long before the access token actually expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of access credentials for the poll cycle
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A usable credential, or `None` while the service is not authorized
    async fn credential(&self) -> Option<Credential>;
}

/// Authorization state of the service
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Unauthorized,
    Authorized(StoredToken),
}

/// OAuth2 authorization-code provider with on-disk token persistence
#[derive(Debug)]
pub struct OAuthCredentialProvider {
    client: Client,
    config: OAuthConfig,
    token_path: PathBuf,
    state: RwLock<AuthState>,
}

impl OAuthCredentialProvider {
    /// Create a provider, restoring any token saved by a previous run
    pub async fn load(config: OAuthConfig, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let token_path = PathBuf::from(&config.token_path);
        let state = match StoredToken::load(&token_path).await {
            Ok(Some(token)) => {
                info!(path = %token_path.display(), "Loaded stored credential");
                AuthState::Authorized(token)
            }
            Ok(None) => AuthState::Unauthorized,
            Err(e) => {
                warn!(path = %token_path.display(), error = %e, "Ignoring unreadable token file");
                AuthState::Unauthorized
            }
        };

        let provider = Self {
            client,
            config,
            token_path,
            state: RwLock::new(state),
        };

        if !provider.is_authorized().await {
            provider.log_authorization_url();
        }

        Ok(provider)
    }

    pub async fn is_authorized(&self) -> bool {
        matches!(*self.state.read().await, AuthState::Authorized(_))
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Consent page URL the operator visits to authorize the service
    pub fn authorization_url(&self) -> Result<String> {
        let scope = self.config.scopes.join(" ");
        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid OAuth auth URL: {}", e)))?;

        Ok(url.to_string())
    }

    fn log_authorization_url(&self) {
        match self.authorization_url() {
            Ok(url) => info!(url = %url, "Authorize this app by visiting this url"),
            Err(e) => warn!(error = %e, "Cannot build authorization URL"),
        }
    }

    /// Exchange an authorization code and move to the authorized state
    #[instrument(skip(self, code))]
    pub async fn complete_authorization(&self, code: &str) -> Result<()> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .await?;

        let mut state = self.state.write().await;
        let previous_refresh = match &*state {
            AuthState::Authorized(token) => token.refresh_token.clone(),
            AuthState::Unauthorized => None,
        };

        let token = StoredToken::from_response(response, previous_refresh, Utc::now());
        if token.refresh_token.is_none() {
            warn!("Token endpoint returned no refresh token; re-authorization will be needed on expiry");
        }
        token.save(&self.token_path).await?;

        *state = AuthState::Authorized(token);
        info!("Authorization completed");
        Ok(())
    }

    /// Refresh the held token if it is about to expire
    async fn refresh_if_needed(&self) -> Option<Credential> {
        let mut state = self.state.write().await;

        // Another caller may have refreshed while we waited for the lock
        let token = match &*state {
            AuthState::Unauthorized => return None,
            AuthState::Authorized(token) => token.clone(),
        };
        let now = Utc::now();
        if !token.expires_within(now, Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Some(Credential::new(token.access_token));
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            warn!("Access token expired and no refresh token is stored");
            *state = AuthState::Unauthorized;
            drop(state);
            self.log_authorization_url();
            return None;
        };

        debug!("Refreshing access token");
        let result = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .await;

        match result {
            Ok(response) => {
                let refreshed = StoredToken::from_response(response, Some(refresh_token), now);
                if let Err(e) = refreshed.save(&self.token_path).await {
                    warn!(error = %e, "Failed to persist refreshed token");
                }
                let credential = Credential::new(refreshed.access_token.clone());
                *state = AuthState::Authorized(refreshed);
                info!("Access token refreshed");
                Some(credential)
            }
            Err(Error::Auth(reason)) => {
                warn!(reason = %reason, "Refresh token rejected; authorization required");
                *state = AuthState::Unauthorized;
                drop(state);
                self.log_authorization_url();
                None
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    /// POST to the token endpoint; rejections map to `Error::Auth`
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::upstream("oauth.token", e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::upstream("oauth.token", format!("invalid token response: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let reason = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or(text);
            return Err(Error::Auth(reason));
        }

        Err(Error::upstream(
            "oauth.token",
            format!("HTTP {}: {}", status.as_u16(), text.trim()),
        ))
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn credential(&self) -> Option<Credential> {
        {
            let state = self.state.read().await;
            match &*state {
                AuthState::Unauthorized => return None,
                AuthState::Authorized(token)
                    if !token.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) =>
                {
                    return Some(Credential::new(token.access_token.clone()));
                }
                AuthState::Authorized(_) => {}
            }
        }

        self.refresh_if_needed().await
    }
}

/// Ready exactly while authorized, so a downgrade is visible on `/readyz`
#[async_trait]
impl ReadinessCheck for OAuthCredentialProvider {
    async fn is_ready(&self) -> bool {
        self.is_authorized().await
    }
}

/// Provider that always hands out the same credential
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider(Option<Credential>);

impl StaticCredentialProvider {
    pub fn new(credential: Option<Credential>) -> Self {
        Self(credential)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credential(&self) -> Option<Credential> {
        self.0.clone()
    }
}
