//! Email delivery client
//!
//! Thin wrapper over an HTTP email API. The service layer treats the client
//! as optional: without credentials, email notifications fail and stay
//! retryable instead of crashing the pipeline.

use serde::{Deserialize, Serialize};

use crate::config::EmailConfig;

/// Email delivery API client
#[derive(Clone)]
pub struct EmailClient {
    api_endpoint: String,
    api_key: String,
    from_address: String,
    http_client: reqwest::Client,
}

/// Email send request
#[derive(Debug, Serialize)]
struct SendEmailRequest {
    from: String,
    to: String,
    subject: String,
    body: String,
}

/// Email API error response
#[derive(Debug, Deserialize)]
struct EmailApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl EmailClient {
    /// Create a new email client
    pub fn new(api_endpoint: String, api_key: String, from_address: String) -> Self {
        Self {
            api_endpoint,
            api_key,
            from_address,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create from configuration; `None` when no endpoint is configured
    pub fn from_config(config: &EmailConfig) -> Option<Self> {
        if config.api_endpoint.is_empty() || config.api_key.is_empty() {
            return None;
        }
        Some(Self::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
            config.from_address.clone(),
        ))
    }

    /// Send one email
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let request = SendEmailRequest {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send email: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error: EmailApiResponse = response.json().await.unwrap_or(EmailApiResponse {
                message: Some("Unknown error".to_string()),
            });
            Err(error.message.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}
