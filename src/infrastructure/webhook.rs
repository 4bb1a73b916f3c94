//! Webhook submission of serial number and customer code.

use crate::domain::models::{SerialNumber, SubmissionReceipt};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const CUSTOMER_HEADER: &str = "customer";
pub const SERIAL_HEADER: &str = "serialNumber";

/// Below this the call is unlikely to ever complete on a real network
const MIN_SENSIBLE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid {name} header value")]
    InvalidHeader { name: &'static str },
    #[error("request timed out")]
    Timeout,
    #[error("network: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("decode: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for WebhookError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e)
        }
    }
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        serial: &SerialNumber,
        customer: &str,
    ) -> Result<SubmissionReceipt, WebhookError>;
}

pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    access_token: Option<String>,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration, access_token: Option<String>) -> Self {
        if timeout < MIN_SENSIBLE_TIMEOUT {
            warn!(
                "Webhook timeout of {:?} will abort most requests; check the configured units",
                timeout
            );
        }
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout,
            access_token: access_token.filter(|token| !token.is_empty()),
        }
    }

    fn headers(&self, serial: &SerialNumber, customer: &str) -> Result<HeaderMap, WebhookError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("customer"),
            HeaderValue::from_str(customer).map_err(|_| WebhookError::InvalidHeader {
                name: CUSTOMER_HEADER,
            })?,
        );
        headers.insert(
            HeaderName::from_static("serialnumber"),
            HeaderValue::from_str(serial.as_str()).map_err(|_| WebhookError::InvalidHeader {
                name: SERIAL_HEADER,
            })?,
        );
        if let Some(token) = &self.access_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| WebhookError::InvalidHeader { name: "authorization" })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// The request `submit` sends
    pub fn build_request(
        &self,
        serial: &SerialNumber,
        customer: &str,
    ) -> Result<reqwest::Request, WebhookError> {
        let request = self
            .http
            .get(&self.url)
            .headers(self.headers(serial, customer)?)
            .timeout(self.timeout)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl Submitter for WebhookClient {
    async fn submit(
        &self,
        serial: &SerialNumber,
        customer: &str,
    ) -> Result<SubmissionReceipt, WebhookError> {
        let request = self.build_request(serial, customer)?;
        info!("Submitting serial {} for customer {}", serial, customer);

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        let receipt = response
            .json::<SubmissionReceipt>()
            .await
            .map_err(|e| WebhookError::Decode(e.to_string()))?;
        info!("Webhook accepted serial {}", serial);
        Ok(receipt)
    }
}
