use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mgcp_messages::codec;
use mgcp_messages::{MessageBus, MessageDirection, MgcpMessage, MgcpMessageObserver, MgcpMessageSubject};

use crate::error::{Error, Result};

/// Largest datagram the receive loop will accept.
const MAX_DATAGRAM_SIZE: usize = 8192;

/// How long `close` waits for the receive loop to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Transport abstraction consumed by the controller.
///
/// A channel is opened, bound to a local address, and closed again; while
/// bound it transmits messages and publishes everything it receives to its
/// observers. The channel is itself a [`MgcpMessageSubject`].
#[async_trait]
pub trait MessageChannel: MgcpMessageSubject {
    /// Prepares the channel for binding. Fails with [`Error::AlreadyOpen`]
    /// when called twice without an intervening `close`.
    async fn open(&self) -> Result<()>;

    /// Binds the channel to `address` and starts receiving.
    async fn bind(&self, address: SocketAddr) -> Result<()>;

    /// Encodes and transmits one message. The transaction registry never
    /// waits on this; failures surface to the caller for logging only.
    async fn send(&self, message: &MgcpMessage, destination: SocketAddr) -> Result<()>;

    /// Stops receiving and releases the socket.
    async fn close(&self) -> Result<()>;

    /// The bound local address.
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// UDP implementation of [`MessageChannel`].
#[derive(Clone)]
pub struct UdpChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    bus: MessageBus,
    state: Mutex<ChannelState>,
}

enum ChannelState {
    Closed,
    Open,
    Bound(BoundChannel),
}

struct BoundChannel {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    receive_task: JoinHandle<()>,
}

impl UdpChannel {
    pub fn new() -> Self {
        UdpChannel {
            inner: Arc::new(ChannelInner {
                bus: MessageBus::new(),
                state: Mutex::new(ChannelState::Closed),
            }),
        }
    }

    fn spawn_receive_loop(
        &self,
        socket: Arc<UdpSocket>,
        local_addr: SocketAddr,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // A dropped sender means the channel is gone; treat
                        // it like an explicit shutdown.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!("MGCP receive loop received shutdown signal");
                            break;
                        }
                    }

                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, source)) => {
                                match codec::decode(&buf[..len]) {
                                    Ok(message) => {
                                        debug!("received MGCP message {} from {}", message, source);
                                        inner
                                            .bus
                                            .notify(source, local_addr, message, MessageDirection::Incoming)
                                            .await;
                                    }
                                    Err(e) => {
                                        warn!("dropping undecodable datagram from {}: {}", source, e);
                                    }
                                }
                            }
                            Err(e) => {
                                error!("error receiving MGCP datagram: {}", e);
                            }
                        }
                    }
                }
            }
            debug!("MGCP receive loop terminated");
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.inner.state.lock().expect("channel state poisoned")
    }
}

impl Default for UdpChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageChannel for UdpChannel {
    async fn open(&self) -> Result<()> {
        let mut state = self.lock_state();
        match *state {
            ChannelState::Closed => {
                *state = ChannelState::Open;
                Ok(())
            }
            ChannelState::Open | ChannelState::Bound(_) => Err(Error::AlreadyOpen),
        }
    }

    async fn bind(&self, address: SocketAddr) -> Result<()> {
        // Bind before taking the lock; the socket is simply dropped again if
        // the state check loses a race.
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|e| Error::BindFailed(address, e))?;
        let local_addr = socket.local_addr().map_err(Error::LocalAddrFailed)?;
        let socket = Arc::new(socket);

        let mut state = self.lock_state();
        match *state {
            ChannelState::Open => {
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                let receive_task =
                    self.spawn_receive_loop(Arc::clone(&socket), local_addr, shutdown_rx);
                *state = ChannelState::Bound(BoundChannel {
                    socket,
                    local_addr,
                    shutdown_tx,
                    receive_task,
                });
                drop(state);
                info!("MGCP channel bound at {}", local_addr);
                Ok(())
            }
            ChannelState::Closed => Err(Error::NotOpen),
            ChannelState::Bound(_) => Err(Error::AlreadyBound),
        }
    }

    async fn send(&self, message: &MgcpMessage, destination: SocketAddr) -> Result<()> {
        let socket = match &*self.lock_state() {
            ChannelState::Bound(bound) => Arc::clone(&bound.socket),
            _ => return Err(Error::NotOpen),
        };

        let bytes = codec::encode(message);
        debug!("sending MGCP message {} to {}", message, destination);
        socket
            .send_to(&bytes, destination)
            .await
            .map_err(|e| Error::SendFailed(destination, e))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let previous = {
            let mut state = self.lock_state();
            std::mem::replace(&mut *state, ChannelState::Closed)
        };

        match previous {
            ChannelState::Bound(bound) => {
                let _ = bound.shutdown_tx.send(true);
                match tokio::time::timeout(SHUTDOWN_GRACE, bound.receive_task).await {
                    Ok(Ok(())) => debug!("MGCP receive loop terminated cleanly"),
                    Ok(Err(e)) => debug!("MGCP receive loop task error: {}", e),
                    Err(_) => warn!("MGCP receive loop termination timed out"),
                }
                info!("MGCP channel closed");
                Ok(())
            }
            ChannelState::Open => Ok(()),
            ChannelState::Closed => Err(Error::NotOpen),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        match &*self.lock_state() {
            ChannelState::Bound(bound) => Ok(bound.local_addr),
            _ => Err(Error::NotOpen),
        }
    }
}

#[async_trait]
impl MgcpMessageSubject for UdpChannel {
    fn observe(&self, observer: Arc<dyn MgcpMessageObserver>) {
        self.inner.bus.observe(observer);
    }

    fn forget(&self, observer: &Arc<dyn MgcpMessageObserver>) {
        self.inner.bus.forget(observer);
    }

    async fn notify(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    ) {
        self.inner.bus.notify(from, to, message, direction).await;
    }
}
