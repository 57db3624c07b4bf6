//! # Outbound Sender
//!
//! POSTs encoded messages to the resolved endpoint. Waiting for the endpoint
//! and close suppression happen in the client; this module only speaks HTTP.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::handler::RequestCustomizer;

/// Statuses that count as an accepted message.
///
/// `204 No Content` is deliberately absent.
const ACCEPTED_STATUSES: [StatusCode; 4] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::PARTIAL_CONTENT,
];

/// Whether the server accepted a POSTed message.
pub fn is_success_status(status: StatusCode) -> bool {
    ACCEPTED_STATUSES.contains(&status)
}

/// HTTP half of the outbound path.
#[derive(Clone)]
pub(crate) struct MessagePoster {
    client: reqwest::Client,
    headers: HeaderMap,
    request_timeout: Option<Duration>,
    customizer: Option<Arc<dyn RequestCustomizer>>,
}

impl MessagePoster {
    pub(crate) fn new(
        client: reqwest::Client,
        headers: HeaderMap,
        request_timeout: Option<Duration>,
        customizer: Option<Arc<dyn RequestCustomizer>>,
    ) -> Self {
        Self {
            client,
            headers,
            request_timeout,
            customizer,
        }
    }

    /// POST `body` to `endpoint` and check the response status.
    pub(crate) async fn post(&self, endpoint: &Url, body: String) -> Result<()> {
        let mut request = self
            .client
            .post(endpoint.clone())
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        if let Some(customizer) = &self.customizer {
            request = customizer
                .customize(request, &Method::POST, endpoint, Some(&body))
                .await;
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        debug!(endpoint = %endpoint, status = status.as_u16(), "message posted");

        if is_success_status(status) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
