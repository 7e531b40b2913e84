//! Context configuration options.
//!
//! Options are ordinary arrows applied by `Context::new` before the caller's
//! pipeline runs.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use crate::arrow::Arrow;
use crate::http::{canonical, HeaderValue};
use crate::transport::Transport;

/// Diagnostic verbosity of the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[default]
    Off,
    /// Request line, status and headers.
    Headers,
    /// Headers plus request and response bodies.
    Payload,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(LogLevel::Off),
            "headers" | "1" => Ok(LogLevel::Headers),
            "payload" | "2" => Ok(LogLevel::Payload),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Headers => "headers",
            LogLevel::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Bind the transport that will perform the exchange.
pub fn transport(transport: impl Transport + 'static) -> Arrow {
    let transport: Rc<dyn Transport> = Rc::new(transport);
    Arrow::new(move |mut ctx| {
        ctx.bind_transport(Rc::clone(&transport));
        ctx
    })
}

/// Bind the ureq transport. It honors a `timeout` option given before or
/// after this one.
pub fn default_transport() -> Arrow {
    Arrow::new(|mut ctx| {
        ctx.bind_default_transport();
        ctx
    })
}

/// Bound the round trip of the ureq transport, binding it when no transport
/// is bound yet. A transport bound with `transport` is left as it is.
pub fn timeout(timeout: Duration) -> Arrow {
    Arrow::new(move |mut ctx| {
        ctx.set_timeout(timeout);
        ctx
    })
}

pub fn log_level(level: LogLevel) -> Arrow {
    Arrow::new(move |mut ctx| {
        ctx.log_level = level;
        ctx
    })
}

/// Pre-populate a header on every request the context builds.
pub fn default_header(name: &str, value: impl Into<HeaderValue>) -> Arrow {
    let name = canonical(name);
    let value = value.into();
    Arrow::new(move |mut ctx| {
        ctx.defaults.insert(name.clone(), value.clone());
        ctx
    })
}
