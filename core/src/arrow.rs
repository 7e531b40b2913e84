//! Arrows and their composition.
//!
//! An `Arrow` is one step of a pipeline: it takes the context and gives it
//! back. `join` chains arrows left to right and stops at the first one that
//! records a failure. Applying any arrow to an already failed context returns
//! that context untouched, so a failure can never be cleared or replaced
//! downstream.

use std::fmt;

use crate::context::Context;
use crate::error::Failure;

pub struct Arrow(Box<dyn Fn(Context) -> Context>);

impl Arrow {
    pub fn new(f: impl Fn(Context) -> Context + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Build an arrow from a fallible step; an `Err` is recorded on the
    /// context.
    pub fn try_new(f: impl Fn(&mut Context) -> Result<(), Failure> + 'static) -> Self {
        Self::new(move |mut ctx| {
            if let Err(failure) = f(&mut ctx) {
                ctx.fail(failure);
            }
            ctx
        })
    }

    pub fn apply(&self, ctx: Context) -> Context {
        if ctx.failure().is_some() {
            return ctx;
        }
        (self.0)(ctx)
    }

    /// Apply the arrow and split the terminal context into its outcome.
    pub fn run(&self, ctx: Context) -> Result<Context, Failure> {
        self.apply(ctx).into_result()
    }
}

impl fmt::Debug for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Arrow(..)")
    }
}

/// Compose arrows into one, failing fast.
pub fn join(arrows: impl IntoIterator<Item = Arrow>) -> Arrow {
    let arrows: Vec<Arrow> = arrows.into_iter().collect();
    Arrow::new(move |mut ctx| {
        for arrow in &arrows {
            ctx = arrow.apply(ctx);
            if ctx.failure().is_some() {
                break;
            }
        }
        ctx
    })
}
