//! Host integration for deferred work.
//!
//! Deferred values and stream emissions are queued rather than applied on the
//! spot. The host is told through [`RuntimeScheduler`] that queued work exists
//! and decides when to call [`Stencil::flush_pending`].
//!
//! [`Stencil::flush_pending`]: crate::Stencil::flush_pending

/// Receives a signal whenever render work is queued.
///
/// Wakers handed to pending futures may be invoked from any thread, so
/// implementations must be thread safe.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host flush pending work soon.
    fn schedule_frame(&self);
}
