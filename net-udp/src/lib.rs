//! UDP channel multiplexer
//!
//! Lets any number of UDP endpoints be opened and closed at runtime while a
//! single background thread services all of them.
//!
//! # Architecture
//!
//! ```text
//! NetUdp
//!     │
//!     ├── RwLock<BTreeMap<ChannelRef, Arc<NetUdpChannel>>>   send/recv lookups
//!     ├── Mutex<Vec<Arc<NetUdpChannel>>>                     poll set, rebuilt on create/destroy
//!     │
//!     └── receiver thread (private current-thread tokio runtime)
//!             │  lock poll set ─► wait ≤500ms for readability ─► recv once per socket
//!             ▼
//!         NetUdpChannel ── VecDeque<Bytes> ──► recv()
//!                       └─ recv callback (receiver thread)
//!                          └─ watch_channel() ─► QueueSource on the main loop
//! ```
//!
//! Channel references are socket descriptors. Datagrams of one channel are
//! returned by `recv` in arrival order; there is no ordering between channels.

pub mod channel;
pub mod error;
pub mod multiplexer;
mod receiver;

pub use channel::{ChannelRef, NetUdpChannel, RecvCallback};
pub use error::{NetUdpError, Result};
pub use multiplexer::NetUdp;
pub use receiver::MAX_PACKET_SIZE;
