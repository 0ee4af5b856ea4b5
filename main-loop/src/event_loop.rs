//! Blocking driver for a [`CompositeSource`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::composite::CompositeSource;
use crate::source::Interrupter;

/// Runs iterations of a composite until asked to quit
#[derive(Debug)]
pub struct MainLoop {
    quit: QuitHandle,
}

/// Thread-safe handle that stops a running [`MainLoop`]
#[derive(Debug, Clone)]
pub struct QuitHandle {
    flag: Arc<AtomicBool>,
    interrupter: Interrupter,
}

impl QuitHandle {
    /// Request the loop to stop after the current iteration
    pub fn quit(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.interrupter.interrupt();
    }

    pub fn is_quit(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl MainLoop {
    pub fn new(root: &CompositeSource) -> Self {
        Self {
            quit: QuitHandle {
                flag: Arc::new(AtomicBool::new(false)),
                interrupter: root.interrupter(),
            },
        }
    }

    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    /// Dispatch sources until [`QuitHandle::quit`] is called
    pub fn run(&self, root: &mut CompositeSource) {
        tracing::info!("Main loop started with {} sources", root.len());

        while !self.quit.is_quit() {
            root.iteration(None);
        }

        tracing::info!("Main loop stopped");
    }

    /// Like [`run`](MainLoop::run) but never waits longer than `tick` per pass
    pub fn run_with_tick(&self, root: &mut CompositeSource, tick: Duration) {
        while !self.quit.is_quit() {
            root.iteration(Some(tick));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_quit_before_run_returns_immediately() {
        let mut root = CompositeSource::new();
        let main_loop = MainLoop::new(&root);
        main_loop.quit_handle().quit();
        main_loop.run(&mut root);
        assert!(main_loop.quit_handle().is_quit());
    }

    #[test]
    fn test_quit_from_worker_thread() {
        let mut root = CompositeSource::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let (source, sender) = QueueSource::new("numbers", move |n: u32| {
            sink.borrow_mut().push(n);
        });
        root.add_child(Box::new(source));

        let main_loop = MainLoop::new(&root);
        let quit = main_loop.quit_handle();

        let worker = std::thread::spawn(move || {
            for n in 0..3 {
                sender.send(n).unwrap();
            }
            std::thread::sleep(Duration::from_millis(20));
            quit.quit();
        });

        main_loop.run(&mut root);
        worker.join().unwrap();

        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }
}
