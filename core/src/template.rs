//! URL templates with positional `%v` placeholders.
//!
//! Each `%v` takes the next argument; `%%` is a literal percent sign; any
//! other `%` sequence is copied as is so pre-encoded templates survive. Text
//! arguments are escaped as a single path segment unless the template starts
//! with `!`. URL arguments are never escaped and lose one trailing slash, so
//! a base URL can be spliced in front of a path.

use std::fmt;
use std::rc::Rc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;
use uuid::Uuid;

use crate::error::Failure;

/// Characters escaped inside a path segment: everything except unreserved
/// characters and the sub-delimiters a segment may carry (`$&+:=@`).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// A positional template argument.
#[derive(Clone)]
pub enum Segment {
    Text(String),
    Url(Url),
    /// Evaluated each time the template is rendered.
    Lazy(Rc<dyn Fn() -> String>),
}

impl Segment {
    pub fn lazy(f: impl Fn() -> String + 'static) -> Self {
        Segment::Lazy(Rc::new(f))
    }

    fn render(&self, escape: bool) -> String {
        match self {
            Segment::Text(text) => maybe_escape(escape, text),
            Segment::Url(url) => match (url.query(), url.fragment()) {
                (None, None) => {
                    let s = url.as_str();
                    s.strip_suffix('/').unwrap_or(s).to_string()
                }
                _ => url.to_string(),
            },
            Segment::Lazy(f) => maybe_escape(escape, &f()),
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Segment::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Segment::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Text(value.to_string())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Text(value)
    }
}

impl From<&String> for Segment {
    fn from(value: &String) -> Self {
        Segment::Text(value.clone())
    }
}

impl From<Url> for Segment {
    fn from(value: Url) -> Self {
        Segment::Url(value)
    }
}

impl From<&Url> for Segment {
    fn from(value: &Url) -> Self {
        Segment::Url(value.clone())
    }
}

impl From<Uuid> for Segment {
    fn from(value: Uuid) -> Self {
        Segment::Text(value.to_string())
    }
}

macro_rules! display_segment {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Segment {
                fn from(value: $ty) -> Self {
                    Segment::Text(value.to_string())
                }
            }
        )*
    };
}

display_segment!(u8, u16, u32, u64, usize, i32, i64, bool, char);

fn maybe_escape(escape: bool, value: &str) -> String {
    if escape {
        utf8_percent_encode(value, PATH_SEGMENT).to_string()
    } else {
        value.to_string()
    }
}

fn bad_template(template: &str, reason: &str) -> Failure {
    Failure::UnsupportedTarget {
        url: template.to_string(),
        reason: reason.to_string(),
    }
}

/// Substitute `args` into `template`.
pub fn render(template: &str, args: &[Segment]) -> Result<String, Failure> {
    let (escape, body) = match template.strip_prefix('!') {
        Some(rest) => (false, rest),
        None => (true, template),
    };

    let mut out = String::with_capacity(body.len());
    let mut args = args.iter();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('v') => {
                let arg = args
                    .next()
                    .ok_or_else(|| bad_template(template, "missing argument for %v"))?;
                out.push_str(&arg.render(escape));
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    if args.next().is_some() {
        return Err(bad_template(template, "too many arguments"));
    }
    Ok(out)
}

/// Render and parse a request target. Only http and https are accepted.
pub fn target(template: &str, args: &[Segment]) -> Result<Url, Failure> {
    let rendered = render(template, args)?;
    let url = Url::parse(&rendered).map_err(|e| Failure::UnsupportedTarget {
        url: rendered.clone(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Failure::UnsupportedTarget {
            url: rendered.clone(),
            reason: format!("scheme {scheme} is not supported"),
        }),
    }
}
