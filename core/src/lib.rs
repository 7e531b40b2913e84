//! Composable pipelines for HTTP contract tests.
//!
//! # Overview
//! A test is an [`Arrow`]: a chain of request-building steps from [`send`]
//! followed by response-matching steps from [`recv`], composed with
//! [`join`] and applied to a fresh [`Context`]. The first matcher that needs
//! the response triggers the exchange through the context's [`Transport`];
//! the response is cached for the rest of the run.
//!
//! ```no_run
//! use assay::{join, recv, send, Context, Slot};
//!
//! #[derive(Default, serde::Deserialize)]
//! struct Site {
//!     site: String,
//! }
//!
//! let site = Slot::<Site>::default();
//! let pipeline = join([
//!     send::get("http://localhost:3000/json", &[]),
//!     send::accept_json(),
//!     recv::code([200]),
//!     recv::served_json(),
//!     recv::recv(&site),
//! ]);
//! let ctx = pipeline.apply(Context::default_io());
//! assert!(ctx.failure().is_none());
//! ```
//!
//! # Design
//! - Failures are values on the context, never panics. Once a failure is
//!   recorded every later arrow is skipped.
//! - The exchange is an explicit state on the context and runs at most once.
//! - A context belongs to one run on one thread; slots are `Rc`-based, so the
//!   compiler keeps contexts and arrows on the thread that built them.

pub mod arrow;
pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod http;
pub mod recv;
pub mod send;
pub mod slot;
pub mod template;
pub mod transport;

pub use arrow::{join, Arrow};
pub use config::LogLevel;
pub use context::Context;
pub use error::Failure;
pub use http::{Body, HeaderValue, HttpMethod, HttpRequest, HttpResponse, Stream};
pub use slot::Slot;
pub use template::Segment;
pub use transport::{Transport, UreqTransport};
