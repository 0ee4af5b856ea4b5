//! One bound UDP socket and its inbound queue

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddrV4;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::Arc;

use bytes::Bytes;
use main_loop::OwnerId;
use parking_lot::Mutex;
use tokio::net::UdpSocket;

use crate::error::{NetUdpError, Result};

/// Public reference to a channel
///
/// The value is the channel's socket descriptor, which is unique among open
/// channels and stable for the channel's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelRef(RawFd);

impl ChannelRef {
    pub const fn from_raw(raw: RawFd) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Notification invoked on the receiver thread for every queued datagram
pub type RecvCallback = Arc<dyn Fn(ChannelRef) + Send + Sync>;

struct RecvSlot {
    callback: RecvCallback,
    owner: Option<OwnerId>,
}

/// A bound UDP socket with its queue of received datagrams
pub struct NetUdpChannel {
    reference: ChannelRef,
    socket: UdpSocket,
    remote: SocketAddrV4,
    local_port: u16,
    packets: Mutex<VecDeque<Bytes>>,
    recv_cb: Mutex<Option<RecvSlot>>,
}

impl NetUdpChannel {
    pub(crate) fn new(socket: UdpSocket, remote: SocketAddrV4, local_port: u16) -> Self {
        Self {
            reference: ChannelRef(socket.as_raw_fd()),
            socket,
            remote,
            local_port,
            packets: Mutex::new(VecDeque::new()),
            recv_cb: Mutex::new(None),
        }
    }

    pub fn reference(&self) -> ChannelRef {
        self.reference
    }

    /// Port the socket is bound to
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Resolved destination of [`send`](NetUdpChannel::send)
    pub fn remote_addr(&self) -> SocketAddrV4 {
        self.remote
    }

    /// Number of datagrams waiting for [`recv`](NetUdpChannel::recv)
    pub fn pending(&self) -> usize {
        self.packets.lock().len()
    }

    /// Send one datagram to the channel's remote address
    pub fn send(&self, buffer: &[u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Err(NetUdpError::InvalidArgument("empty send buffer"));
        }

        self.socket
            .try_send_to(buffer, self.remote.into())
            .map_err(|source| NetUdpError::Send {
                channel: self.reference,
                source,
            })
    }

    /// Pop the oldest queued datagram into `buffer`
    ///
    /// Copies at most `buffer.len()` bytes and drops the remainder of a
    /// longer datagram. Returns `0` without blocking when nothing is queued.
    pub fn recv(&self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Err(NetUdpError::InvalidArgument("empty receive buffer"));
        }

        let Some(packet) = self.packets.lock().pop_front() else {
            return Ok(0);
        };

        let count = packet.len().min(buffer.len());
        if count < packet.len() {
            tracing::debug!(
                "Truncating {} byte datagram on {} to {} bytes",
                packet.len(),
                self.reference,
                count
            );
        }
        buffer[..count].copy_from_slice(&packet[..count]);
        Ok(count)
    }

    /// Install or clear the receive notification; the last writer wins
    pub fn set_recv_cb(&self, callback: Option<RecvCallback>, owner: Option<OwnerId>) {
        *self.recv_cb.lock() = callback.map(|callback| RecvSlot { callback, owner });
    }

    /// Owner recorded with the current receive notification
    pub fn get_recv_cb_owner(&self) -> Option<OwnerId> {
        self.recv_cb.lock().as_ref().and_then(|slot| slot.owner)
    }

    /// Clear the receive notification only if `owner` installed it
    pub fn clear_recv_cb_if_owner(&self, owner: OwnerId) -> bool {
        let mut slot = self.recv_cb.lock();
        if slot.as_ref().and_then(|s| s.owner) == Some(owner) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Queue a received datagram and notify the consumer
    pub(crate) fn deliver(&self, packet: Bytes) {
        self.packets.lock().push_back(packet);

        let callback = self
            .recv_cb
            .lock()
            .as_ref()
            .map(|slot| Arc::clone(&slot.callback));
        if let Some(callback) = callback {
            callback(self.reference);
        }
    }
}

impl fmt::Debug for NetUdpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetUdpChannel")
            .field("reference", &self.reference)
            .field("local_port", &self.local_port)
            .field("remote", &self.remote)
            .field("pending", &self.pending())
            .finish()
    }
}
