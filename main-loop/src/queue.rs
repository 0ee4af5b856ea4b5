//! Bridge that carries values from worker threads onto the scheduler thread
//!
//! A worker owns a [`QueueSender`]; the scheduler owns the matching
//! [`QueueSource`]. Every send wakes the scheduler, and the source's dispatch
//! hands all queued values to its handler in the order they were sent.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crossbeam::channel::{self, Receiver, Sender};

use crate::source::{Dispatch, Source, Wakeup};

/// Scheduler-side end of a thread bridge
pub struct QueueSource<T> {
    name: String,
    rx: Receiver<T>,
    wakeup: Arc<OnceLock<Wakeup>>,
    handler: Box<dyn FnMut(T)>,
}

/// Worker-side end of a thread bridge
pub struct QueueSender<T> {
    tx: Sender<T>,
    wakeup: Arc<OnceLock<Wakeup>>,
}

impl<T> QueueSource<T> {
    pub fn new(
        name: impl Into<String>,
        handler: impl FnMut(T) + 'static,
    ) -> (Self, QueueSender<T>) {
        let (tx, rx) = channel::unbounded();
        let wakeup = Arc::new(OnceLock::new());

        let source = Self {
            name: name.into(),
            rx,
            wakeup: Arc::clone(&wakeup),
            handler: Box::new(handler),
        };
        (source, QueueSender { tx, wakeup })
    }

    /// Number of values waiting for dispatch
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl<T> QueueSender<T> {
    /// Queue a value and wake the scheduler
    ///
    /// Values sent before the source is attached are delivered on the first
    /// dispatch after attachment. Returns the value if the source is gone.
    pub fn send(&self, value: T) -> Result<(), T> {
        self.tx.send(value).map_err(|err| err.into_inner())?;
        if let Some(wakeup) = self.wakeup.get() {
            wakeup.wake();
        }
        Ok(())
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wakeup: Arc::clone(&self.wakeup),
        }
    }
}

impl<T> Source for QueueSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, wakeup: Wakeup) {
        if self.wakeup.set(wakeup).is_err() {
            tracing::warn!("Queue source {} attached twice", self.name);
        }
    }

    fn check(&mut self) -> bool {
        !self.rx.is_empty()
    }

    fn dispatch(&mut self) -> Dispatch {
        while let Ok(value) = self.rx.try_recv() {
            (self.handler)(value);
        }
        Dispatch::Continue
    }
}

impl<T> fmt::Debug for QueueSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSource")
            .field("name", &self.name)
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl<T> fmt::Debug for QueueSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSender")
            .field("attached", &self.wakeup.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompositeSource;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn test_values_sent_before_attach_are_delivered() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let (source, sender) = QueueSource::new("early", move |s: &'static str| {
            sink.borrow_mut().push(s);
        });

        sender.send("first").unwrap();
        sender.send("second").unwrap();
        assert_eq!(source.pending(), 2);

        let mut root = CompositeSource::new();
        root.add_child(Box::new(source));

        assert_eq!(root.iteration(Some(Duration::from_millis(5))), 1);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_send_after_source_dropped_returns_value() {
        let (source, sender) = QueueSource::new("gone", |_: u8| {});
        drop(source);
        assert_eq!(sender.send(7), Err(7));
    }

    #[test]
    fn test_cross_thread_delivery_wakes_iteration() {
        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        let (source, sender) = QueueSource::new("worker", move |n: u32| {
            *sink.borrow_mut() += n;
        });

        let mut root = CompositeSource::new();
        root.add_child(Box::new(source));

        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sender.send(5).unwrap();
        });

        let mut dispatched = 0;
        while dispatched == 0 {
            dispatched = root.iteration(Some(Duration::from_secs(2)));
        }
        worker.join().unwrap();
        assert_eq!(*seen.borrow(), 5);
    }
}
