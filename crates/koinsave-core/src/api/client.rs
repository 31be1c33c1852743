//! API client for the KoinSave sign-in and sign-up endpoints.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::forms::{SignInForm, SignUpForm};
use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
}

/// API client for the credential exchange.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Exchange credentials for a bearer token.
    ///
    /// The token is returned as-is; storing it is the caller's job
    /// (`AuthSession::login`).
    pub async fn sign_in(&self, form: &SignInForm) -> Result<String, ApiError> {
        let url = self.endpoint("signin");
        debug!(%url, email = %form.email, "Signing in");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(form)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        if response.status() != StatusCode::OK {
            return Err(ApiError::InvalidResponse(format!(
                "Unexpected sign-in status {}",
                response.status()
            )));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse sign-in response: {}", e)))?;

        if body.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("Sign-in response has an empty token".to_string()));
        }
        Ok(body.token)
    }

    /// Register a new account. Success means the caller should go to sign-in.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<(), ApiError> {
        let url = self.endpoint("signup");
        debug!(%url, email = %form.email, "Signing up");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(form)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(ApiError::InvalidResponse(format!(
                "Unexpected sign-up status {}",
                status
            ))),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }
}
