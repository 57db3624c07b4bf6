//! # Endpoint Resolver
//!
//! Single-assignment cell for the URL that outbound messages are POSTed to.
//!
//! The server announces the endpoint through the first `endpoint` event on
//! the push channel. Senders wait on the cell until it leaves the pending
//! state; every waiter observes the same terminal value:
//!
//! - `Resolved(url)`: the endpoint passed validation
//! - `Rejected`: the endpoint was malformed or escaped the base URL
//! - `Closed`: the session ended before any endpoint arrived
//!
//! Only the first transition out of `Pending` takes effect.

use reqwest::Url;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::TransportError;

/// Why an announced endpoint was not accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointRejection {
    /// Raw payload of the `endpoint` event.
    pub endpoint: String,
    /// Human-readable reason.
    pub reason: String,
}

impl From<EndpointRejection> for TransportError {
    fn from(value: EndpointRejection) -> Self {
        Self::EndpointValidation {
            endpoint: value.endpoint,
            reason: value.reason,
        }
    }
}

/// Outcome for a waiter when no endpoint will ever be available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unresolved {
    /// The announced endpoint failed validation.
    Rejected(EndpointRejection),
    /// The session closed (or its stream ended) before resolution.
    Closed,
}

#[derive(Clone, Debug)]
enum EndpointState {
    Pending,
    Resolved(Url),
    Rejected(EndpointRejection),
    Closed,
}

/// Exactly-once holder of the message endpoint.
#[derive(Debug)]
pub struct EndpointResolver {
    base_url: Url,
    state: watch::Sender<EndpointState>,
}

impl EndpointResolver {
    /// Create an unresolved cell validated against `base_url`.
    pub fn new(base_url: Url) -> Self {
        let (state, _) = watch::channel(EndpointState::Pending);
        Self { base_url, state }
    }

    /// Base URL announced endpoints are checked against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validate and store an announced endpoint.
    ///
    /// Returns `Ok(true)` when this call resolved the cell, `Ok(false)` when
    /// the cell had already left the pending state (the payload is ignored),
    /// and `Err` when validation failed; the rejection is then terminal.
    pub fn resolve(&self, raw: &str) -> Result<bool, TransportError> {
        if !self.is_pending() {
            warn!(endpoint = raw, "ignoring endpoint event, endpoint already settled");
            return Ok(false);
        }

        let outcome = resolve_endpoint_url(&self.base_url, raw);
        let next = match &outcome {
            Ok(url) => EndpointState::Resolved(url.clone()),
            Err(rejection) => EndpointState::Rejected(rejection.clone()),
        };

        let applied = self.state.send_if_modified(|state| {
            if matches!(state, EndpointState::Pending) {
                *state = next;
                true
            } else {
                false
            }
        });

        if !applied {
            warn!(endpoint = raw, "ignoring endpoint event, endpoint already settled");
            return Ok(false);
        }

        match outcome {
            Ok(url) => {
                info!(endpoint = %url, "message endpoint resolved");
                Ok(true)
            }
            Err(rejection) => Err(rejection.into()),
        }
    }

    /// Settle the cell as closed if it is still pending.
    ///
    /// Wakes every waiter. A resolved or rejected endpoint is left as is.
    pub fn close(&self) {
        let _ = self.state.send_if_modified(|state| {
            if matches!(state, EndpointState::Pending) {
                *state = EndpointState::Closed;
                true
            } else {
                false
            }
        });
    }

    /// Whether no endpoint has been settled yet.
    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), EndpointState::Pending)
    }

    /// The resolved endpoint, if any, without waiting.
    pub fn current(&self) -> Option<Url> {
        match &*self.state.borrow() {
            EndpointState::Resolved(url) => Some(url.clone()),
            _ => None,
        }
    }

    /// Wait until the cell leaves the pending state.
    pub async fn wait(&self) -> Result<Url, Unresolved> {
        let mut rx = self.state.subscribe();
        let settled = match rx
            .wait_for(|state| !matches!(state, EndpointState::Pending))
            .await
        {
            Ok(state) => (*state).clone(),
            Err(_) => EndpointState::Closed,
        };

        match settled {
            EndpointState::Resolved(url) => Ok(url),
            EndpointState::Rejected(rejection) => Err(Unresolved::Rejected(rejection)),
            EndpointState::Pending | EndpointState::Closed => Err(Unresolved::Closed),
        }
    }
}

/// Resolve an announced endpoint against the base URL.
///
/// - blank payload: the base URL itself
/// - relative payload: joined onto the base URL, and must still share the
///   base URL's scheme and authority (a `//host/path` payload names a host)
/// - absolute payload: accepted only if it shares scheme and authority with
///   the base URL and lives under the base URL's path
pub fn resolve_endpoint_url(base: &Url, raw: &str) -> Result<Url, EndpointRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(base.clone());
    }

    let reject = |reason: String| EndpointRejection {
        endpoint: raw.to_owned(),
        reason,
    };

    if let Ok(absolute) = Url::parse(trimmed) {
        if let Some(reason) =
            check_same_origin(base, &absolute).or_else(|| check_under_base_path(base, &absolute))
        {
            return Err(reject(reason));
        }
        return Ok(absolute);
    }

    let joined = base
        .join(trimmed)
        .map_err(|e| reject(format!("malformed URL: {e}")))?;
    match check_same_origin(base, &joined) {
        Some(reason) => Err(reject(reason)),
        None => Ok(joined),
    }
}

fn check_same_origin(base: &Url, endpoint: &Url) -> Option<String> {
    if base.scheme() != endpoint.scheme() {
        return Some(format!(
            "scheme {} does not match base scheme {}",
            endpoint.scheme(),
            base.scheme()
        ));
    }

    let same_authority = base.username() == endpoint.username()
        && base.password() == endpoint.password()
        && base.host_str() == endpoint.host_str()
        && base.port_or_known_default() == endpoint.port_or_known_default();
    if !same_authority {
        return Some(format!(
            "authority {} does not match base authority {}",
            endpoint.host_str().unwrap_or_default(),
            base.host_str().unwrap_or_default()
        ));
    }

    None
}

fn check_under_base_path(base: &Url, endpoint: &Url) -> Option<String> {
    let base_path = base.path().trim_end_matches('/');
    let endpoint_path = endpoint.path();
    let under_base = base_path.is_empty()
        || endpoint_path == base_path
        || endpoint_path
            .strip_prefix(base_path)
            .is_some_and(|rest| rest.starts_with('/'));
    if !under_base {
        return Some(format!(
            "path {endpoint_path} is outside base path {}",
            base.path()
        ));
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
