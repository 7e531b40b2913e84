//! Response-matching and decoding arrows.
//!
//! # Design
//! Every arrow here needs the response, so each one asks the context to run
//! the exchange first. The exchange is memoized on the context, which makes
//! the first matcher in a pipeline the one that actually sends the request
//! and every later matcher a reader of the cached response.
//!
//! `served*` arrows check the response content type and record which decoder
//! `recv` should use. Values captured from the response are written into
//! caller slots, and only when the arrow succeeds.

use serde::de::DeserializeOwned;

use crate::arrow::Arrow;
use crate::error::Failure;
use crate::http::canonical;
use crate::slot::Slot;

/// Body decoder selected by a `served*` arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Json,
    Form,
    /// Pass-through: the body is only available raw, through `bytes` or
    /// `text`.
    Any,
}

impl Decoder {
    /// Decode table, keyed on a content type substring.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        if content_type.contains("json") {
            Some(Decoder::Json)
        } else if content_type.contains("www-form") {
            Some(Decoder::Form)
        } else {
            None
        }
    }

    fn decode<T: DeserializeOwned>(self, body: &[u8]) -> Result<T, Failure> {
        match self {
            Decoder::Json => {
                serde_json::from_slice(body).map_err(|e| Failure::Decode(e.to_string()))
            }
            Decoder::Form => {
                serde_urlencoded::from_bytes(body).map_err(|e| Failure::Decode(e.to_string()))
            }
            Decoder::Any => Err(Failure::UnsupportedContentType("*/*".to_string())),
        }
    }
}

/// Media type without parameters, lower-cased.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Assert the status code is one of `expected`.
pub fn code(expected: impl IntoIterator<Item = u16>) -> Arrow {
    let expected: Vec<u16> = expected.into_iter().collect();
    Arrow::try_new(move |ctx| {
        let actual = ctx.resolve()?.status;
        if expected.contains(&actual) {
            Ok(())
        } else {
            Err(Failure::Status {
                expected: expected.clone(),
                actual,
            })
        }
    })
}

/// A response header, named case-insensitively.
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
    /// Require the header to carry exactly `value`.
    pub fn is(&self, value: impl Into<String>) -> Arrow {
        let name = self.name.clone();
        let expected = value.into();
        Arrow::try_new(move |ctx| match ctx.resolve()?.header(&name) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(Failure::mismatch(
                format!("header {name}: expected {expected}, got {actual}"),
                actual,
            )),
            None => Err(Failure::mismatch(
                format!("header {name}: expected {expected}, got nothing"),
                "",
            )),
        })
    }

    /// Require the header to be present with any value.
    pub fn any(&self) -> Arrow {
        let name = self.name.clone();
        Arrow::try_new(move |ctx| match ctx.resolve()?.header(&name) {
            Some(_) => Ok(()),
            None => Err(Failure::undefined(name.clone())),
        })
    }

    /// Copy the header value into `slot`.
    pub fn string(&self, slot: &Slot<String>) -> Arrow {
        let name = self.name.clone();
        let slot = slot.clone();
        Arrow::try_new(move |ctx| {
            let value = ctx
                .resolve()?
                .header(&name)
                .ok_or_else(|| Failure::undefined(name.clone()))?;
            slot.set(value.to_string());
            Ok(())
        })
    }
}

/// Content type assertions that select the body decoder.
#[derive(Debug, Clone, Copy)]
pub struct Served;

pub fn served() -> Served {
    Served
}

impl Served {
    /// Accept whatever was served; only raw body access is planned.
    pub fn any(&self) -> Arrow {
        Arrow::try_new(|ctx| {
            ctx.resolve()?;
            ctx.decoder = Some(Decoder::Any);
            Ok(())
        })
    }

    /// Require the media type of the response to be `content_type`.
    pub fn is(&self, content_type: &str) -> Arrow {
        let expected = media_type(content_type);
        let decoder = Decoder::for_content_type(&expected).unwrap_or(Decoder::Any);
        Arrow::try_new(move |ctx| {
            let actual = ctx
                .resolve()?
                .content_type()
                .ok_or_else(|| Failure::undefined("content-type"))?;
            if media_type(actual) != expected {
                return Err(Failure::mismatch(
                    format!("content-type: expected {expected}, got {actual}"),
                    actual,
                ));
            }
            ctx.decoder = Some(decoder);
            Ok(())
        })
    }
}

pub fn served_json() -> Arrow {
    served().is("application/json")
}

pub fn served_form() -> Arrow {
    served().is("application/x-www-form-urlencoded")
}

/// Decode the body into `slot` with the decoder chosen by `served*`.
///
/// Without a `served*` arrow the decoder comes from the response content
/// type. After `served().any()` only raw access is allowed, so `recv` fails
/// with `UnsupportedContentType`.
pub fn recv<T: DeserializeOwned + 'static>(slot: &Slot<T>) -> Arrow {
    let slot = slot.clone();
    Arrow::try_new(move |ctx| {
        let selected = ctx.decoder;
        let response = ctx.resolve()?;
        let content_type = response.content_type().unwrap_or_default();
        let decoder = match selected {
            Some(decoder @ (Decoder::Json | Decoder::Form)) => decoder,
            Some(Decoder::Any) => {
                return Err(Failure::UnsupportedContentType(content_type.to_string()));
            }
            None => Decoder::for_content_type(content_type)
                .ok_or_else(|| Failure::UnsupportedContentType(content_type.to_string()))?,
        };
        let value = decoder.decode(&response.body)?;
        slot.set(value);
        Ok(())
    })
}

/// Copy the raw body into `slot`.
pub fn bytes(slot: &Slot<Vec<u8>>) -> Arrow {
    let slot = slot.clone();
    Arrow::try_new(move |ctx| {
        let body = ctx.resolve()?.body.clone();
        slot.set(body);
        Ok(())
    })
}

/// Copy the body into `slot` as UTF-8 text.
pub fn text(slot: &Slot<String>) -> Arrow {
    let slot = slot.clone();
    Arrow::try_new(move |ctx| {
        let body = ctx.resolve()?.body.clone();
        let text = String::from_utf8(body).map_err(|e| Failure::Decode(e.to_string()))?;
        slot.set(text);
        Ok(())
    })
}
