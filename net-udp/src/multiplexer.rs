//! Channel table management and the public multiplexer API

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use main_loop::{OwnerId, QueueSource};
use tokio::runtime::{Builder, Runtime};

use crate::channel::{ChannelRef, NetUdpChannel, RecvCallback};
use crate::error::{NetUdpError, Result};
use crate::receiver::{spawn_receiver, Shared};

/// Multiplexer owning every open UDP channel and the receiver thread
///
/// Channels are created and destroyed from any thread; all inbound traffic
/// is read by one background thread that queues datagrams per channel.
/// Dropping the multiplexer stops the receiver, then closes every channel.
pub struct NetUdp {
    shared: Arc<Shared>,
    runtime: Arc<Runtime>,
    receiver: Option<JoinHandle<()>>,
}

impl NetUdp {
    /// Start the multiplexer and its receiver thread
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(NetUdpError::Receiver)?;
        let runtime = Arc::new(runtime);

        let shared = Arc::new(Shared::new());
        let receiver = spawn_receiver(Arc::clone(&shared), Arc::clone(&runtime))
            .map_err(NetUdpError::Receiver)?;

        tracing::info!("UDP multiplexer started");

        Ok(Self {
            shared,
            runtime,
            receiver: Some(receiver),
        })
    }

    /// Open a channel bound to `local_port` on all interfaces
    ///
    /// `remote_host` must resolve to an IPv4 address. Broadcast is enabled
    /// when the remote address is the limited broadcast address. The channel
    /// is visible to the receiver before this returns; on failure nothing is
    /// inserted.
    pub fn create_channel(
        &self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<ChannelRef> {
        let remote = resolve_ipv4(remote_host, remote_port)?;

        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
            .map_err(|source| NetUdpError::Bind {
                port: local_port,
                source,
            })?;
        socket.set_nonblocking(true).map_err(NetUdpError::Socket)?;
        if remote.ip().is_broadcast() {
            socket.set_broadcast(true).map_err(NetUdpError::Socket)?;
        }
        let bound_port = socket.local_addr().map_err(NetUdpError::Socket)?.port();

        let socket = {
            let _guard = self.runtime.enter();
            tokio::net::UdpSocket::from_std(socket).map_err(NetUdpError::Socket)?
        };

        let channel = Arc::new(NetUdpChannel::new(socket, remote, bound_port));
        let reference = channel.reference();

        self.shared.update(|index| index.insert(reference, channel));

        tracing::debug!(
            "Created {} on port {} for {}",
            reference,
            bound_port,
            remote
        );
        Ok(reference)
    }

    /// Close a channel and discard its unread datagrams
    ///
    /// Destroying an unknown or already destroyed reference is a no-op.
    pub fn destroy_channel(&self, reference: ChannelRef) {
        let removed = self.shared.update(|index| index.remove(&reference));

        if let Some(channel) = removed {
            tracing::debug!(
                "Destroyed {} with {} unread datagrams",
                reference,
                channel.pending()
            );
            let _guard = self.runtime.enter();
            drop(channel);
        }
    }

    /// Look up a live channel
    pub fn get_channel_by_ref(&self, reference: ChannelRef) -> Option<Arc<NetUdpChannel>> {
        self.shared.index.read().get(&reference).cloned()
    }

    fn channel(&self, reference: ChannelRef) -> Result<Arc<NetUdpChannel>> {
        self.get_channel_by_ref(reference)
            .ok_or(NetUdpError::NoSuchChannel(reference))
    }

    /// Send one datagram on a channel
    pub fn send(&self, reference: ChannelRef, buffer: &[u8]) -> Result<usize> {
        self.channel(reference)?.send(buffer)
    }

    /// Pop the oldest datagram of a channel; `0` when none is queued
    pub fn recv(&self, reference: ChannelRef, buffer: &mut [u8]) -> Result<usize> {
        self.channel(reference)?.recv(buffer)
    }

    /// Install or clear the receive notification of a channel
    ///
    /// The callback runs on the receiver thread with the poll set locked; it
    /// must not create or destroy channels.
    pub fn set_recv_cb(
        &self,
        reference: ChannelRef,
        callback: Option<RecvCallback>,
        owner: Option<OwnerId>,
    ) -> Result<()> {
        self.channel(reference)?.set_recv_cb(callback, owner);
        Ok(())
    }

    pub fn get_recv_cb_owner(&self, reference: ChannelRef) -> Result<Option<OwnerId>> {
        Ok(self.channel(reference)?.get_recv_cb_owner())
    }

    pub fn clear_recv_cb_if_owner(&self, reference: ChannelRef, owner: OwnerId) -> Result<bool> {
        Ok(self.channel(reference)?.clear_recv_cb_if_owner(owner))
    }

    /// Main-loop source that runs `handler` for every datagram queued on
    /// `reference`
    ///
    /// Replaces the channel's receive notification. The handler runs on the
    /// scheduler thread and may freely create or destroy channels.
    pub fn watch_channel(
        &self,
        reference: ChannelRef,
        owner: OwnerId,
        handler: impl FnMut(ChannelRef) + 'static,
    ) -> Result<QueueSource<ChannelRef>> {
        let channel = self.channel(reference)?;
        let (source, sender) = QueueSource::new(format!("udp {}", reference), handler);

        let callback: RecvCallback = Arc::new(move |reference| {
            if sender.send(reference).is_err() {
                tracing::debug!("Watch on {} outlived its source", reference);
            }
        });
        channel.set_recv_cb(Some(callback), Some(owner));

        Ok(source)
    }

    /// Number of open channels
    pub fn len(&self) -> usize {
        self.shared.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// References of every open channel
    pub fn channels(&self) -> Vec<ChannelRef> {
        self.shared.index.read().keys().copied().collect()
    }
}

impl Drop for NetUdp {
    fn drop(&mut self) {
        self.shared.done.store(true, Ordering::Release);

        if let Some(receiver) = self.receiver.take() {
            if receiver.join().is_err() {
                tracing::error!("UDP receiver thread panicked");
            }
        }

        let _guard = self.runtime.enter();
        self.shared.update(|index| index.clear());

        tracing::info!("UDP multiplexer stopped");
    }
}

impl fmt::Debug for NetUdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetUdp")
            .field("channels", &self.channels())
            .finish()
    }
}

/// Resolve a host to its first IPv4 address
fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddrV4> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| NetUdpError::Resolve {
            host: host.to_string(),
            source,
        })?;

    addrs
        .into_iter()
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| NetUdpError::NoIpv4Address(host.to_string()))
}
