//! Form-token login and logged-in detection.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::HarvestConfig;
use crate::extract::compile_static_regex;
use crate::session::{HeaderProfile, SessionClient, TransportError};
use crate::site::Endpoints;

const TOKEN_PATTERN: &str = r#"name="post_key" value="([a-f0-9]{32})""#;
const LOGGED_IN_MARKER: &str = r#"class="item header-logout""#;
const MAX_ECHOED_BODY: usize = 200;

/// Classified outcome of one login submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// The server accepted the credentials.
    Success,
    /// The server flagged the request as an error.
    GeneralError {
        /// Server-provided message.
        message: String,
    },
    /// The server rejected one or more form fields.
    ValidationError {
        /// Field messages, ordered by field name.
        messages: Vec<String>,
    },
}

/// Errors that can occur while logging in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login page could not be fetched or carried no token.
    #[error("failed to obtain login token: {reason}")]
    TokenFetch {
        /// Why the token is unavailable.
        reason: String,
    },

    /// The login submission failed at the transport level.
    #[error("login request failed: {0}")]
    Transport(#[from] TransportError),

    /// The login response was not JSON.
    #[error("login response is not valid JSON: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// The server reported a general error.
    #[error("login rejected: {message}")]
    General {
        /// Server-provided message.
        message: String,
    },

    /// The server rejected form fields.
    #[error("login validation failed:\n{}", .messages.join("\n"))]
    Validation {
        /// Field messages, ordered by field name.
        messages: Vec<String>,
    },

    /// The JSON carried none of the error, validation or success markers.
    #[error("unrecognized login response: {body}")]
    UnrecognizedResponse {
        /// Leading part of the response body.
        body: String,
    },
}

/// Obtains a login token, submits credentials, and checks session state.
#[derive(Debug)]
pub struct Authenticator {
    client: SessionClient,
    endpoints: Endpoints,
    token_re: Regex,
    token_retries: u32,
    check_retries: u32,
}

impl Authenticator {
    /// Creates an authenticator over `client`.
    #[must_use]
    pub fn new(client: SessionClient, endpoints: Endpoints, config: &HarvestConfig) -> Self {
        Self {
            client,
            endpoints,
            token_re: compile_static_regex(TOKEN_PATTERN),
            token_retries: config.login_token_retries,
            check_retries: config.login_check_retries,
        }
    }

    /// Fetches the login page and extracts the one-time form token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenFetch`] when the page cannot be fetched or
    /// the token pattern does not match.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        let page = self
            .client
            .get(
                &self.endpoints.login_page_url(),
                &HeaderProfile::login_page(&self.endpoints),
                self.token_retries,
            )
            .await
            .map_err(|error| AuthError::TokenFetch {
                reason: error.to_string(),
            })?;

        let text = page.text();
        self.token_re
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|token| token.as_str().to_string())
            .ok_or_else(|| AuthError::TokenFetch {
                reason: format!("token pattern not found (HTTP {})", page.status),
            })
    }

    /// Submits credentials and returns the classified server response.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] for token, transport and unparseable-response
    /// failures. Server-side rejections come back as `Ok` variants.
    #[instrument(skip(self, password), fields(user = %username))]
    pub async fn submit(&self, username: &str, password: &str) -> Result<AuthResult, AuthError> {
        let token = self.fetch_token().await?;
        debug!("obtained login token");

        let body = form_body(&[
            ("pixiv_id", username),
            ("password", password),
            ("captcha", ""),
            ("g_recaptcha_response", ""),
            ("post_key", &token),
            ("source", "pc"),
            ("ref", "wwwtop_accounts_index"),
            ("return_to", &self.endpoints.root_url()),
        ]);

        let response = self
            .client
            .post(
                &self.endpoints.login_api_url(),
                &HeaderProfile::login_xhr(&self.endpoints),
                body,
            )
            .await?;

        classify_login_response(&response.body)
    }

    /// Logs in, turning every non-success outcome into an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::General`] or [`AuthError::Validation`] when the
    /// server rejects the login, and the errors of [`submit`](Self::submit).
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        match self.submit(username, password).await? {
            AuthResult::Success => {
                info!("login succeeded");
                Ok(())
            }
            AuthResult::GeneralError { message } => {
                warn!(message = %message, "login rejected");
                Err(AuthError::General { message })
            }
            AuthResult::ValidationError { messages } => {
                warn!(fields = messages.len(), "login failed validation");
                Err(AuthError::Validation { messages })
            }
        }
    }

    /// Returns true when the site root shows the logged-in marker.
    ///
    /// Transport failures count as "not logged in".
    #[instrument(level = "debug", skip(self))]
    pub async fn is_logged_in(&self) -> bool {
        match self
            .client
            .get(
                &self.endpoints.root_url(),
                &HeaderProfile::page(),
                self.check_retries,
            )
            .await
        {
            Ok(page) => page.text().contains(LOGGED_IN_MARKER),
            Err(error) => {
                debug!(error = %error, "login check failed; assuming logged out");
                false
            }
        }
    }
}

/// Classifies a login response body.
///
/// Priority: top-level `error: true`, then `body.validation_errors`, then
/// `body.success`.
///
/// # Errors
///
/// Returns [`AuthError::MalformedResponse`] for non-JSON bodies and
/// [`AuthError::UnrecognizedResponse`] when no marker is present.
pub fn classify_login_response(body: &[u8]) -> Result<AuthResult, AuthError> {
    let value: Value = serde_json::from_slice(body).map_err(AuthError::MalformedResponse)?;

    if value.get("error").and_then(Value::as_bool) == Some(true) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Ok(AuthResult::GeneralError { message });
    }

    let payload = value.get("body").and_then(Value::as_object);

    if let Some(errors) = payload
        .and_then(|payload| payload.get("validation_errors"))
        .and_then(Value::as_object)
    {
        let messages = errors
            .values()
            .map(|message| match message {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        return Ok(AuthResult::ValidationError { messages });
    }

    if payload.is_some_and(|payload| payload.contains_key("success")) {
        return Ok(AuthResult::Success);
    }

    let text = String::from_utf8_lossy(body);
    Err(AuthError::UnrecognizedResponse {
        body: text.chars().take(MAX_ECHOED_BODY).collect(),
    })
}

fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
