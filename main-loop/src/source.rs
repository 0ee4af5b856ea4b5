//! Schedulable units and the handles used to wake them

use std::fmt;
use std::time::Instant;

use crossbeam::channel::Sender;

/// Identifier of a child within a [`CompositeSource`](crate::CompositeSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) u64);

impl SourceId {
    /// Raw numeric value, stable for the lifetime of the child
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// What the scheduler should do with a source after dispatching it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep the source attached
    Continue,
    /// Detach and drop the source
    Remove,
}

/// A unit of work serviced by the cooperative scheduler
///
/// A source becomes ready in one of three ways:
/// - a worker thread signals the [`Wakeup`] handed to [`Source::attach`]
/// - [`Source::check`] returns `true` when the scheduler inspects it
/// - the instant returned by [`Source::deadline`] has passed
///
/// `dispatch` always runs on the scheduler thread and must not block.
pub trait Source {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Called once when the source is added to a composite
    fn attach(&mut self, _wakeup: Wakeup) {}

    /// Next instant at which the source wants to be dispatched
    fn deadline(&self) -> Option<Instant> {
        None
    }

    /// Readiness that does not go through a wakeup
    fn check(&mut self) -> bool {
        false
    }

    /// Service the source
    fn dispatch(&mut self) -> Dispatch;
}

/// Signals carried on the composite's wake channel
#[derive(Debug, Clone, Copy)]
pub(crate) enum Signal {
    Ready(SourceId),
    Interrupt,
}

/// Cloneable, thread-safe handle that marks one source ready
///
/// Waking a source that has since been removed is silently ignored.
#[derive(Clone)]
pub struct Wakeup {
    id: SourceId,
    tx: Sender<Signal>,
}

impl Wakeup {
    pub(crate) fn new(id: SourceId, tx: Sender<Signal>) -> Self {
        Self { id, tx }
    }

    /// Mark the source ready and interrupt a blocked iteration
    pub fn wake(&self) {
        // The receiver lives as long as the composite; a send error means
        // the scheduler is gone and there is nobody left to wake.
        let _ = self.tx.send(Signal::Ready(self.id));
    }

    /// The source this handle wakes
    pub fn source_id(&self) -> SourceId {
        self.id
    }
}

impl fmt::Debug for Wakeup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wakeup").field("id", &self.id).finish()
    }
}

/// Handle that interrupts a blocked iteration without readying any source
#[derive(Clone)]
pub struct Interrupter {
    tx: Sender<Signal>,
}

impl Interrupter {
    pub(crate) fn new(tx: Sender<Signal>) -> Self {
        Self { tx }
    }

    pub fn interrupt(&self) {
        let _ = self.tx.send(Signal::Interrupt);
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupter")
    }
}
