//! The network collaborator behind the exchange.
//!
//! # Design
//! The pipeline core never opens a socket. It hands a fully built
//! `HttpRequest` to a `Transport` exactly once per context and stores what
//! comes back. `UreqTransport` is the default binding: a blocking ureq agent
//! with status-as-error disabled, so 4xx/5xx responses come back as data and
//! the `recv` arrows decide what they mean.

use std::time::Duration;

use crate::error::Failure;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport {
    /// Perform one request/response round trip. Implementations must not
    /// retry.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Failure>;
}

/// Blocking HTTP/1.1 transport backed by ureq.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Bound the whole round trip, from connect to the last body byte.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Failure> {
        let payload = request
            .payload
            .to_bytes()
            .map_err(|e| Failure::Transport(e.to_string()))?;

        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in request.resolved_headers() {
            builder = builder.header(name, value);
        }

        let sent = if payload.is_empty() {
            builder
                .body(())
                .map_err(|e| Failure::Transport(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(|e| Failure::Transport(e.to_string())))
        } else {
            builder
                .body(payload)
                .map_err(|e| Failure::Transport(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(|e| Failure::Transport(e.to_string())))
        };
        let mut response = sent?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| Failure::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn unreachable_host_is_a_transport_failure() {
        let transport = UreqTransport::with_timeout(Some(Duration::from_secs(2)));
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let url = url::Url::parse("http://127.0.0.1:9/").unwrap();
        let err = transport
            .execute(&HttpRequest::new(HttpMethod::Get, url))
            .unwrap_err();
        assert!(matches!(err, Failure::Transport(_)));
    }
}
