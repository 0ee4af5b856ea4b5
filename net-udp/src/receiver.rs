//! Background receiver shared by every channel
//!
//! The thread owns no channels. Each pass it takes the poll-set lock, waits a
//! bounded time for any socket in the poll set to become readable, and moves
//! every available datagram onto its channel's queue before releasing the
//! lock again.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use futures::future::select_all;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Runtime;

use crate::channel::{ChannelRef, NetUdpChannel};

/// Largest datagram the receiver accepts; longer ones are truncated
pub const MAX_PACKET_SIZE: usize = 1536;

/// Pause before each pass so API callers get a chance at the lock
const YIELD_DELAY: Duration = Duration::from_micros(500);

/// Pause when no channel is open
const IDLE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound of one readiness wait; also bounds shutdown latency
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Channels indexed by reference for the API paths
pub(crate) type ChannelIndex = BTreeMap<ChannelRef, Arc<NetUdpChannel>>;

/// State shared between the API and the receiver thread
///
/// Lock order is `poll_set` before `index`. The receiver only ever takes
/// `poll_set`, so `send`/`recv` never wait behind a readiness wait.
pub(crate) struct Shared {
    pub(crate) index: RwLock<ChannelIndex>,
    pub(crate) poll_set: Mutex<Vec<Arc<NetUdpChannel>>>,
    pub(crate) done: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            index: RwLock::new(BTreeMap::new()),
            poll_set: Mutex::new(Vec::new()),
            done: AtomicBool::new(false),
        }
    }

    /// Apply a change to the index and regenerate the poll set from it
    pub(crate) fn update<R>(&self, change: impl FnOnce(&mut ChannelIndex) -> R) -> R {
        let mut poll_set = self.poll_set.lock();
        let mut index = self.index.write();
        let result = change(&mut index);
        *poll_set = index.values().cloned().collect();
        result
    }
}

pub(crate) fn spawn_receiver(
    shared: Arc<Shared>,
    runtime: Arc<Runtime>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("net-udp-recv".to_string())
        .spawn(move || {
            runtime.block_on(receive_loop(shared));
        })
}

async fn receive_loop(shared: Arc<Shared>) {
    let mut scratch = vec![0u8; MAX_PACKET_SIZE];

    tracing::debug!("UDP receiver started");

    while !shared.done.load(Ordering::Acquire) {
        tokio::time::sleep(YIELD_DELAY).await;

        if !poll_once(&shared, &mut scratch).await {
            tokio::time::sleep(IDLE_DELAY).await;
        }
    }

    tracing::debug!("UDP receiver stopped");
}

/// One locked pass over the poll set; returns `false` when there was
/// nothing to poll
// The poll-set lock spans the readiness wait so the set cannot change
// mid-pass.
#[allow(clippy::await_holding_lock)]
async fn poll_once(shared: &Shared, scratch: &mut [u8]) -> bool {
    let poll_set = shared.poll_set.lock();
    if poll_set.is_empty() {
        return false;
    }

    let waits = poll_set
        .iter()
        .map(|channel| Box::pin(channel.socket().readable()));

    match tokio::time::timeout(POLL_TIMEOUT, select_all(waits)).await {
        Err(_elapsed) => return true,
        Ok((Err(e), index, _)) => {
            tracing::warn!("Polling {} failed: {}", poll_set[index].reference(), e);
            return true;
        }
        Ok((Ok(()), _, _)) => {}
    }

    for channel in poll_set.iter() {
        match channel.socket().try_recv_from(scratch) {
            Ok((len, peer)) => {
                tracing::trace!("{} received {} bytes from {}", channel.reference(), len, peer);
                channel.deliver(Bytes::copy_from_slice(&scratch[..len]));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::warn!("Receive on {} failed: {}", channel.reference(), e);
                break;
            }
        }
    }

    true
}
