//! # Handler abstraction and function-backed handler.
//!
//! A [`Handler`] turns an [`Emission`] into a fresh future. [`HandlerFn`] wraps
//! a closure `F: Fn(Emission) -> Fut`, producing a new future per emission, so
//! no state is shared between emissions unless the closure captures an `Arc`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use studyflow::{HandlerFn, HandlerRef};
//!
//! let shown = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&shown);
//! let h: HandlerRef = HandlerFn::arc(move |_e| {
//!     let counter = Arc::clone(&counter);
//!     async move {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         anyhow::Ok(())
//!     }
//! });
//! # let _ = h;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::channel::Emission;

/// Future returned by a handler.
pub type BoxHandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Shared handler reference.
pub type HandlerRef = Arc<dyn Handler>;

/// # Asynchronous lifecycle handler.
///
/// The returned future may suspend (await input, timers, ...); the emitting
/// lifecycle call waits for it before invoking the next handler.
pub trait Handler: Send + Sync + 'static {
    /// Creates the future handling one emission.
    fn handle(&self, emission: Emission) -> BoxHandlerFuture;
}

/// Function-backed handler.
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut> HandlerFn<F>
where
    F: Fn(Emission) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Wraps a closure.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Emission) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn handle(&self, emission: Emission) -> BoxHandlerFuture {
        Box::pin((self.f)(emission))
    }
}
