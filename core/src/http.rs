//! HTTP request and response described as plain data.
//!
//! # Design
//! Arrows build an `HttpRequest` on the context and read an `HttpResponse`
//! from it; neither type touches the network. The `Transport` collaborator
//! is the only code that turns one into the other.
//!
//! Header names are lower-cased on the way in, both for the request map and
//! for the response list, so every lookup goes through `canonical`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::rc::Rc;
use std::str::FromStr;

use url::Url;

use crate::slot::Slot;

pub(crate) fn canonical(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// Value bound to a request header.
#[derive(Debug, Clone)]
pub enum HeaderValue {
    Literal(String),
    /// Read when the exchange runs, not when the arrow runs.
    Slot(Slot<String>),
}

impl HeaderValue {
    pub fn resolve(&self) -> String {
        match self {
            HeaderValue::Literal(value) => value.clone(),
            HeaderValue::Slot(slot) => slot.get(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Literal(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Literal(value)
    }
}

/// A byte source opened by the caller. The transport reads it; nothing else
/// does.
#[derive(Clone)]
pub struct Stream(Rc<RefCell<dyn Read>>);

impl Stream {
    pub fn new(reader: impl Read + 'static) -> Self {
        Self(Rc::new(RefCell::new(reader)))
    }

    pub(crate) fn read_to_end(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.borrow_mut().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Stream(..)")
    }
}

/// Outbound payload as it will go on the wire.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Stream(Stream),
}

impl Body {
    /// Drain the body into memory. A stream body is consumed by this call.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Body::Empty => Ok(Vec::new()),
            Body::Bytes(bytes) => Ok(bytes.clone()),
            Body::Stream(stream) => stream.read_to_end(),
        }
    }
}

/// The outbound request under construction.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, HeaderValue>,
    pub payload: Body,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            payload: Body::Empty,
        }
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(&canonical(name))
    }

    pub fn set_header(&mut self, name: &str, value: HeaderValue) {
        self.headers.insert(canonical(name), value);
    }

    /// Headers with slot bindings read at this moment.
    pub fn resolved_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.clone(), value.resolve()))
            .collect()
    }
}

/// The inbound response, present once the exchange ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of the header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = canonical(name);
        self.headers
            .iter()
            .find(|(key, _)| canonical(key) == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("BREW".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn request_headers_are_lower_cased() {
        let mut req = HttpRequest::new(HttpMethod::Get, Url::parse("http://h/").unwrap());
        req.set_header("Content-Type", "application/json".into());
        assert!(req.headers.contains_key("content-type"));
        assert_eq!(req.header("CONTENT-TYPE").unwrap().resolve(), "application/json");
    }

    #[test]
    fn slot_header_resolves_late() {
        let token = Slot::new(String::new());
        let mut req = HttpRequest::new(HttpMethod::Get, Url::parse("http://h/").unwrap());
        req.set_header("Authorization", HeaderValue::Slot(token.clone()));
        token.set("Bearer x".to_string());
        assert_eq!(
            req.resolved_headers(),
            vec![("authorization".to_string(), "Bearer x".to_string())]
        );
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Vec::new(),
        };
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.header("X-Missing"), None);
    }

    #[test]
    fn stream_body_is_read_by_to_bytes() {
        let body = Body::Stream(Stream::new(std::io::Cursor::new(b"abc".to_vec())));
        assert_eq!(body.to_bytes().unwrap(), b"abc");
    }
}
