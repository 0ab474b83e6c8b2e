//! ABOUTME: Index page and OAuth redirect target
//! ABOUTME: A successful callback moves the credential provider to authorized

use actix_web::{web, HttpResponse, Result};
use lg_core::Error;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::WebState;

const HTML: &str = "text/html; charset=utf-8";

/// Query parameters the authorization server appends to the redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/auth", web::get().to(auth_callback))
        .route("/auth/{tail:.*}", web::get().to(auth_callback));
}

async fn index(state: web::Data<WebState>) -> Result<HttpResponse> {
    let authorize = if state.auth.is_authorized().await {
        String::new()
    } else {
        match state.auth.authorization_url() {
            Ok(url) => format!(
                "<p>Not authorized yet. <a href=\"{}\">Authorize</a></p>\n",
                escape_attr(&url)
            ),
            Err(e) => {
                warn!(error = %e, "Cannot build authorization URL for index page");
                "<p>Not authorized yet.</p>\n".to_string()
            }
        }
    };

    Ok(HttpResponse::Ok().content_type(HTML).body(format!(
        "<!doctype html>\n<html><head><title>livegauge</title></head><body>\n\
         <h1>livegauge</h1>\n<p><a href=\"/metrics\">Metrics</a></p>\n{}</body></html>\n",
        authorize
    )))
}

async fn auth_callback(
    state: web::Data<WebState>,
    params: web::Query<CallbackParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();

    if let Some(error) = params.error {
        warn!(error = %error, "Authorization was denied");
        return Ok(HttpResponse::BadRequest()
            .content_type(HTML)
            .body(format!("<p>Authorization failed: {}</p>\n", escape_attr(&error))));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        debug!("Authorization callback without a code");
        return Ok(HttpResponse::BadRequest()
            .content_type(HTML)
            .body("<p>Missing authorization code</p>\n"));
    };

    match state.auth.complete_authorization(&code).await {
        Ok(()) => {
            info!("Service authorized, polling will start on the next tick");
            Ok(HttpResponse::Ok()
                .content_type(HTML)
                .body("<p>Authentication successful! Please return to the console.</p>\n"))
        }
        Err(e) => {
            warn!(error = %e, "Authorization code exchange failed");
            let reason = match e {
                Error::Auth(reason) => reason,
                other => other.to_string(),
            };
            Ok(HttpResponse::BadGateway()
                .content_type(HTML)
                .body(format!("<p>Authorization failed: {}</p>\n", escape_attr(&reason))))
        }
    }
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
