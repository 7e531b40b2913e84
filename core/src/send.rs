//! Request-building arrows.
//!
//! # Design
//! A pipeline starts with `url` (or one of the method shorthands), which
//! installs a fresh outbound request on the context. Header, query and
//! payload arrows then refine that request and fail with
//! `Failure::NoRequest` when it does not exist yet.
//!
//! `send` picks an encoding from the `content-type` already bound on the
//! request. Raw text, bytes and streams go out verbatim; structured values are
//! encoded with the table below.
//!
//! | content type contains | encoding |
//! |---|---|
//! | `json` | `serde_json::to_vec` |
//! | `www-form` | flat key/value map, form-urlencoded |

use serde::Serialize;
use serde_json::Value;

use crate::arrow::Arrow;
use crate::error::Failure;
use crate::form;
use crate::http::{canonical, Body, HeaderValue, HttpMethod, HttpRequest, Stream};
use crate::slot::Slot;
use crate::template::{self, Segment};

/// Set method and target of the request from a URL template.
pub fn url(method: HttpMethod, template: &str, args: &[Segment]) -> Arrow {
    let template = template.to_string();
    let args = args.to_vec();
    Arrow::try_new(move |ctx| {
        let target = template::target(&template, &args)?;
        ctx.begin(HttpRequest::new(method, target));
        Ok(())
    })
}

pub fn get(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Get, template, args)
}

pub fn post(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Post, template, args)
}

pub fn put(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Put, template, args)
}

pub fn patch(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Patch, template, args)
}

pub fn delete(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Delete, template, args)
}

pub fn head(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Head, template, args)
}

pub fn options(template: &str, args: &[Segment]) -> Arrow {
    url(HttpMethod::Options, template, args)
}

/// A request header, named case-insensitively.
#[derive(Debug, Clone)]
pub struct Header {
    name: String,
}

pub fn header(name: &str) -> Header {
    Header {
        name: canonical(name),
    }
}

impl Header {
    /// Bind a literal value.
    pub fn is(&self, value: impl Into<String>) -> Arrow {
        self.bind(HeaderValue::Literal(value.into()))
    }

    /// Bind the value held by `slot` when the request goes out.
    pub fn val(&self, slot: &Slot<String>) -> Arrow {
        self.bind(HeaderValue::Slot(slot.clone()))
    }

    fn bind(&self, value: HeaderValue) -> Arrow {
        let name = self.name.clone();
        Arrow::try_new(move |ctx| {
            ctx.request_mut()?.set_header(&name, value.clone());
            Ok(())
        })
    }
}

/// Append the fields of a flat value to the query string.
pub fn params<T: Serialize + ?Sized>(query: &T) -> Arrow {
    let pairs = form::flatten(query);
    Arrow::try_new(move |ctx| {
        let request = ctx.request_mut()?;
        let pairs = pairs.clone()?;
        if !pairs.is_empty() {
            request.url.query_pairs_mut().extend_pairs(&pairs);
        }
        Ok(())
    })
}

/// Input to `send`.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    /// Handed to the transport unread.
    Stream(Stream),
    /// Encoded according to the request content type.
    Value(Value),
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Binary(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Payload::Binary(value.to_vec())
    }
}

impl From<Stream> for Payload {
    fn from(value: Stream) -> Self {
        Payload::Stream(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

/// Set the request payload. A `content-type` header must be bound first.
pub fn send(data: impl Into<Payload>) -> Arrow {
    let data = data.into();
    Arrow::try_new(move |ctx| {
        let request = ctx.request_mut()?;
        let content_type = request
            .header("content-type")
            .map(HeaderValue::resolve)
            .ok_or(Failure::UnknownContentType)?;

        request.payload = match &data {
            Payload::Text(text) => Body::Bytes(text.clone().into_bytes()),
            Payload::Binary(bytes) => Body::Bytes(bytes.clone()),
            Payload::Stream(stream) => Body::Stream(stream.clone()),
            Payload::Value(value) => Body::Bytes(encode(&content_type, value)?),
        };
        Ok(())
    })
}

/// Serialize any value and send it as a structured payload.
pub fn send_value<T: Serialize + ?Sized>(value: &T) -> Arrow {
    match serde_json::to_value(value) {
        Ok(value) => send(Payload::Value(value)),
        Err(e) => {
            let failure = Failure::Encode(e.to_string());
            Arrow::try_new(move |_| Err(failure.clone()))
        }
    }
}

fn encode(content_type: &str, value: &Value) -> Result<Vec<u8>, Failure> {
    if content_type.contains("json") {
        serde_json::to_vec(value).map_err(|e| Failure::Encode(e.to_string()))
    } else if content_type.contains("www-form") {
        form::encode(value)
    } else {
        Err(Failure::UnsupportedContentType(content_type.to_string()))
    }
}

pub fn accept() -> Header {
    header("Accept")
}

pub fn accept_json() -> Arrow {
    accept().is("application/json")
}

pub fn accept_form() -> Arrow {
    accept().is("application/x-www-form-urlencoded")
}

pub fn content() -> Header {
    header("Content-Type")
}

pub fn content_json() -> Arrow {
    content().is("application/json")
}

pub fn content_form() -> Arrow {
    content().is("application/x-www-form-urlencoded")
}

pub fn keep_alive() -> Arrow {
    header("Connection").is("keep-alive")
}

pub fn authorization() -> Header {
    header("Authorization")
}

pub fn bearer(token: &str) -> Arrow {
    authorization().is(format!("Bearer {token}"))
}
