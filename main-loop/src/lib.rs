//! Cooperative scheduler for the remote-control daemon
//!
//! Every backend of the daemon that waits on something (a socket, a GPIO
//! value file, a child process, a timer) is serviced from one thread. Backends
//! that need blocking I/O run a private worker thread and surface a single
//! wakeup-capable [`Source`] to the root [`CompositeSource`], so command
//! dispatch and event delivery never run concurrently with each other.
//!
//! # Architecture
//!
//! ```text
//! CompositeSource (root, no trigger of its own)
//!     │
//!     ├── children: BTreeMap<SourceId, Box<dyn Source>>
//!     │
//!     └── wake channel ◄── Wakeup (cloned into worker threads)
//!                       ◄── QueueSender<T> (worker -> QueueSource<T>)
//!                       ◄── QuitHandle
//! ```
//!
//! # Example
//!
//! ```rust
//! use main_loop::{CompositeSource, QueueSource};
//! use std::time::Duration;
//!
//! let mut root = CompositeSource::new();
//! let (source, sender) = QueueSource::new("numbers", |n: u32| assert_eq!(n, 42));
//! root.add_child(Box::new(source));
//!
//! std::thread::spawn(move || sender.send(42).unwrap()).join().unwrap();
//! assert_eq!(root.iteration(Some(Duration::from_secs(1))), 1);
//! ```

pub mod composite;
pub mod event_loop;
pub mod owner;
pub mod queue;
pub mod source;

pub use composite::CompositeSource;
pub use event_loop::{MainLoop, QuitHandle};
pub use owner::{OwnerId, OwnerIds};
pub use queue::{QueueSender, QueueSource};
pub use source::{Dispatch, Interrupter, Source, SourceId, Wakeup};
