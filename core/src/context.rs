//! The per-run carrier of pipeline state.
//!
//! # Design
//! A `Context` is created fresh for each pipeline run and moved through the
//! arrows by value. It owns the outbound request, the inbound response, the
//! sticky failure and the exchange state. The exchange is an explicit tagged
//! value: `Pending` holds the transport until the first arrow that needs the
//! response asks for it, after which it is `Resolved` for the rest of the run
//! whether the round trip succeeded or not.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::arrow::Arrow;
use crate::config::{self, LogLevel};
use crate::error::Failure;
use crate::http::{Body, HeaderValue, HttpRequest, HttpResponse};
use crate::recv::Decoder;
use crate::transport::{Transport, UreqTransport};

pub(crate) enum Exchange {
    Unbound,
    /// A ureq transport, built at exchange time with the context timeout.
    Default,
    Pending(Rc<dyn Transport>),
    Resolved,
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Unbound => f.write_str("Unbound"),
            Exchange::Default => f.write_str("Default"),
            Exchange::Pending(_) => f.write_str("Pending"),
            Exchange::Resolved => f.write_str("Resolved"),
        }
    }
}

#[derive(Debug)]
pub struct Context {
    failure: Option<Failure>,
    request: Option<HttpRequest>,
    response: Option<HttpResponse>,
    exchange: Exchange,
    pub(crate) decoder: Option<Decoder>,
    pub(crate) defaults: BTreeMap<String, HeaderValue>,
    pub(crate) log_level: LogLevel,
    pub(crate) timeout: Option<Duration>,
}

impl Context {
    /// Build a context and apply each config option to it in order.
    pub fn new(options: impl IntoIterator<Item = Arrow>) -> Self {
        let empty = Self {
            failure: None,
            request: None,
            response: None,
            exchange: Exchange::Unbound,
            decoder: None,
            defaults: BTreeMap::new(),
            log_level: LogLevel::Off,
            timeout: None,
        };
        options.into_iter().fold(empty, |ctx, option| option.apply(ctx))
    }

    /// A context bound to the default ureq transport.
    pub fn default_io() -> Self {
        Self::new([config::default_transport()])
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// True once the exchange ran, successfully or not.
    pub fn is_resolved(&self) -> bool {
        matches!(self.exchange, Exchange::Resolved)
    }

    /// Record a failure. The first failure wins; later ones are dropped.
    pub fn fail(&mut self, failure: Failure) {
        if self.failure.is_none() {
            tracing::debug!("pipeline failed: {failure}");
            self.failure = Some(failure);
        }
    }

    /// Split a terminal context into its outcome.
    pub fn into_result(self) -> Result<Self, Failure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self),
        }
    }

    /// Run the exchange if it has not run yet. Arrow-shaped: any failure is
    /// recorded on the returned context.
    pub fn exchange(mut self) -> Self {
        let outcome = self.resolve().map(|_| ());
        if let Err(failure) = outcome {
            self.fail(failure);
        }
        self
    }

    pub(crate) fn bind_transport(&mut self, transport: Rc<dyn Transport>) {
        if !self.is_resolved() {
            self.exchange = Exchange::Pending(transport);
        }
    }

    pub(crate) fn bind_default_transport(&mut self) {
        if !self.is_resolved() {
            self.exchange = Exchange::Default;
        }
    }

    /// Bound the default transport. A transport bound by the caller keeps
    /// its own timeout policy.
    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
        if matches!(self.exchange, Exchange::Unbound) {
            self.exchange = Exchange::Default;
        }
    }

    /// Start a new outbound request; default headers are copied in.
    pub(crate) fn begin(&mut self, mut request: HttpRequest) {
        for (name, value) in &self.defaults {
            request.headers.entry(name.clone()).or_insert_with(|| value.clone());
        }
        self.request = Some(request);
    }

    pub(crate) fn request_mut(&mut self) -> Result<&mut HttpRequest, Failure> {
        self.request.as_mut().ok_or(Failure::NoRequest)
    }

    /// The response, running the exchange first when needed.
    pub(crate) fn resolve(&mut self) -> Result<&HttpResponse, Failure> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if !self.is_resolved() {
            let request = self.request.as_ref().ok_or(Failure::NoRequest)?;
            let transport: Rc<dyn Transport> = match &self.exchange {
                Exchange::Pending(transport) => Rc::clone(transport),
                Exchange::Default => Rc::new(UreqTransport::with_timeout(self.timeout)),
                _ => return Err(Failure::NoTransport),
            };
            self.exchange = Exchange::Resolved;

            trace_request(self.log_level, request);
            let response = transport.execute(request)?;
            trace_response(self.log_level, &response);
            self.response = Some(response);
        }
        self.response
            .as_ref()
            .ok_or_else(|| Failure::Transport("exchange produced no response".to_string()))
    }
}

const REDACTED: [&str; 2] = ["authorization", "proxy-authorization"];

fn header_line(prefix: &str, name: &str, value: &str) -> String {
    if REDACTED.contains(&name) {
        format!("{prefix} {name}: <redacted>")
    } else {
        format!("{prefix} {name}: {value}")
    }
}

/// Lines logged for an outbound request at `level`.
fn request_lines(level: LogLevel, request: &HttpRequest) -> Vec<String> {
    let mut lines = Vec::new();
    if level >= LogLevel::Headers {
        lines.push(format!(">> {} {}", request.method, request.url));
        for (name, value) in request.resolved_headers() {
            lines.push(header_line(">>", &name, &value));
        }
    }
    // Stream payloads are left for the transport to read.
    if level >= LogLevel::Payload {
        if let Body::Bytes(bytes) = &request.payload {
            lines.push(format!(">> {}", String::from_utf8_lossy(bytes)));
        }
    }
    lines
}

/// Lines logged for an inbound response at `level`.
fn response_lines(level: LogLevel, response: &HttpResponse) -> Vec<String> {
    let mut lines = Vec::new();
    if level >= LogLevel::Headers {
        lines.push(format!("<< {}", response.status));
        for (name, value) in &response.headers {
            lines.push(header_line("<<", name, value));
        }
    }
    if level >= LogLevel::Payload {
        lines.push(format!("<< {}", String::from_utf8_lossy(&response.body)));
    }
    lines
}

fn trace_request(level: LogLevel, request: &HttpRequest) {
    tracing::debug!(method = %request.method, url = %request.url, "sending request");
    for line in request_lines(level, request) {
        tracing::info!("{line}");
    }
}

fn trace_response(level: LogLevel, response: &HttpResponse) {
    tracing::debug!(status = response.status, "received response");
    for line in response_lines(level, response) {
        tracing::info!("{line}");
    }
}
