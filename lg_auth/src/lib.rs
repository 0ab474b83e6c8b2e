//! ABOUTME: OAuth2 credential provider for the platform API
//! ABOUTME: Runs the authorization-code flow, refreshes and persists tokens

pub mod provider;
pub mod token;

pub use provider::{AuthState, CredentialProvider, OAuthCredentialProvider, StaticCredentialProvider};
pub use token::StoredToken;
