//! Root scheduling unit that fans many child sources into one wait

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::source::{Dispatch, Interrupter, Signal, Source, SourceId, Wakeup};

struct Child {
    source: Box<dyn Source>,
    pending: bool,
}

/// Aggregate of independently-built sources, serviced from one thread
///
/// The composite has no trigger of its own. Each call to
/// [`iteration`](CompositeSource::iteration) blocks until a child is woken,
/// a child deadline passes, or the maximum wait elapses, then dispatches
/// every ready child in insertion order.
pub struct CompositeSource {
    children: BTreeMap<SourceId, Child>,
    next_id: u64,
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl CompositeSource {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            children: BTreeMap::new(),
            next_id: 1,
            tx,
            rx,
        }
    }

    /// Attach a child and hand it its wakeup handle
    pub fn add_child(&mut self, mut source: Box<dyn Source>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;

        source.attach(Wakeup::new(id, self.tx.clone()));
        tracing::debug!("Attached {} as {}", source.name(), id);

        self.children.insert(
            id,
            Child {
                source,
                pending: false,
            },
        );
        id
    }

    /// Detach and drop a child, returning whether it was attached
    pub fn remove_child(&mut self, id: SourceId) -> bool {
        match self.children.remove(&id) {
            Some(child) => {
                tracing::debug!("Detached {} ({})", child.source.name(), id);
                true
            }
            None => false,
        }
    }

    /// Mark a child ready from the scheduler thread
    pub fn wakeup(&mut self, id: SourceId) {
        if let Some(child) = self.children.get_mut(&id) {
            child.pending = true;
        }
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.children.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Handle that unblocks a waiting iteration from any thread
    pub fn interrupter(&self) -> Interrupter {
        Interrupter::new(self.tx.clone())
    }

    /// Earliest deadline among all children
    pub fn next_deadline(&self) -> Option<Instant> {
        self.children
            .values()
            .filter_map(|child| child.source.deadline())
            .min()
    }

    /// Run one scheduling pass
    ///
    /// Waits at most `max_wait` (forever when `None`) for a child to become
    /// ready, then dispatches every ready child. Returns the number of
    /// children dispatched; zero means the wait timed out or was interrupted.
    pub fn iteration(&mut self, max_wait: Option<Duration>) -> usize {
        let interrupted = self.drain_signals();

        if !interrupted && !self.any_ready(Instant::now()) {
            let limit = max_wait.map(|wait| Instant::now() + wait);
            let wait_until = match (self.next_deadline(), limit) {
                (Some(deadline), Some(limit)) => Some(deadline.min(limit)),
                (deadline, limit) => deadline.or(limit),
            };

            let signal = match wait_until {
                Some(instant) => match self.rx.recv_deadline(instant) {
                    Ok(signal) => Some(signal),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => None,
                },
                None => self.rx.recv().ok(),
            };

            if let Some(signal) = signal {
                self.apply(signal);
                self.drain_signals();
            }
        }

        self.dispatch_ready()
    }

    /// Apply every queued signal, returning whether an interrupt was seen
    fn drain_signals(&mut self) -> bool {
        let mut interrupted = false;
        while let Ok(signal) = self.rx.try_recv() {
            interrupted |= self.apply(signal);
        }
        interrupted
    }

    fn apply(&mut self, signal: Signal) -> bool {
        match signal {
            Signal::Ready(id) => {
                self.wakeup(id);
                false
            }
            Signal::Interrupt => true,
        }
    }

    fn any_ready(&mut self, now: Instant) -> bool {
        self.children.values_mut().any(|child| {
            child.pending
                || child.source.deadline().is_some_and(|d| d <= now)
                || child.source.check()
        })
    }

    fn dispatch_ready(&mut self) -> usize {
        let now = Instant::now();
        let ids: Vec<SourceId> = self.children.keys().copied().collect();
        let mut dispatched = 0;

        for id in ids {
            let Some(child) = self.children.get_mut(&id) else {
                continue;
            };

            let ready = child.pending
                || child.source.deadline().is_some_and(|d| d <= now)
                || child.source.check();
            if !ready {
                continue;
            }

            child.pending = false;
            dispatched += 1;

            if child.source.dispatch() == Dispatch::Remove {
                self.remove_child(id);
            }
        }

        dispatched
    }
}

impl Default for CompositeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .children
            .values()
            .map(|child| child.source.name())
            .collect();
        f.debug_struct("CompositeSource")
            .field("children", &names)
            .finish()
    }
}
