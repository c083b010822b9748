//! Mutation events and the listener abstraction.
//!
//! A listener, when installed, is invoked synchronously by the context that
//! performed the mutation, after the cursor update and before the call
//! returns. The listener must not block and must not call back into the
//! same ring instance.

/// What kind of mutation fired the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Bytes left the buffer (`read` or `skip`).
    Read,
    /// Bytes entered the buffer (`write` or `advance`).
    Write,
    /// Both cursors were reset; buffered content was discarded.
    Reset,
}

/// Synchronous observer of ring mutations.
///
/// Fired with the event kind and the number of bytes transferred (0 for
/// [`EventKind::Reset`]). Implementations are shared between the producing
/// and consuming contexts, hence the `Send + Sync` bounds.
pub trait EventListener: Send + Sync {
    /// Called after each successful mutation.
    fn on_event(&self, kind: EventKind, bytes: usize);
}

/// Plain closures work as listeners.
impl<F> EventListener for F
where
    F: Fn(EventKind, usize) + Send + Sync,
{
    #[inline]
    fn on_event(&self, kind: EventKind, bytes: usize) {
        self(kind, bytes);
    }
}
