//! The controller orchestrating the MGCP control plane.
//!
//! The controller owns the lifecycle (inactive → active → inactive), wires
//! itself as an observer of the channel, the transaction manager and the
//! endpoint manager, and routes every observed message through a four-way
//! dispatch on direction and message kind:
//!
//! | direction | message  | action                                                     |
//! |-----------|----------|------------------------------------------------------------|
//! | incoming  | request  | provide command, open transaction; duplicate → provisional |
//! | outgoing  | request  | open transaction, transmit; duplicate → suppressed         |
//! | incoming  | response | close transaction; unmatched → dropped                     |
//! | outgoing  | response | close transaction, transmit; unmatched → suppressed        |
//!
//! Protocol anomalies are absorbed here; nothing short of lifecycle misuse
//! ever reaches the caller.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use mgcp_messages::{
    MessageDirection, MgcpMessage, MgcpMessageObserver, MgcpMessageSubject, MgcpRequest,
    MgcpResponse, ResponseCode,
};
use mgcp_transport::MessageChannel;

use crate::command::MgcpCommandProvider;
use crate::error::{ControllerError, Result};
use crate::transaction::{MgcpTransactionManager, RequestOutcome, ResponseOutcome};

/// Cheaply cloneable handle; all clones drive the same controller.
#[derive(Clone)]
pub struct MgcpController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    // Collaborators, injected at construction
    channel: Arc<dyn MessageChannel>,
    transactions: MgcpTransactionManager,
    endpoints: Arc<dyn MgcpMessageSubject>,
    commands: Arc<dyn MgcpCommandProvider>,

    // Controller state
    address: SocketAddr,
    active: AtomicBool,
}

impl MgcpController {
    pub fn new(
        address: SocketAddr,
        channel: Arc<dyn MessageChannel>,
        transactions: MgcpTransactionManager,
        endpoints: Arc<dyn MgcpMessageSubject>,
        commands: Arc<dyn MgcpCommandProvider>,
    ) -> Self {
        MgcpController {
            inner: Arc::new(ControllerInner {
                channel,
                transactions,
                endpoints,
                commands,
                address,
                active: AtomicBool::new(false),
            }),
        }
    }

    /// Opens and binds the channel, registers the controller as an observer
    /// of its three publishers, and starts the transaction reaper.
    ///
    /// Fails with [`ControllerError::AlreadyActive`] on an active controller;
    /// a channel setup failure leaves the controller inactive.
    pub async fn activate(&self) -> Result<()> {
        let inner = &self.inner;
        if inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ControllerError::AlreadyActive);
        }

        if let Err(e) = self.bring_up().await {
            inner.active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        info!("MGCP controller is active");
        Ok(())
    }

    async fn bring_up(&self) -> Result<()> {
        let inner = &self.inner;
        inner.channel.open().await?;
        if let Err(e) = inner.channel.bind(inner.address).await {
            let _ = inner.channel.close().await;
            return Err(e.into());
        }
        info!("opened MGCP channel at {}", inner.address);

        let observer = Arc::clone(inner) as Arc<dyn MgcpMessageObserver>;
        inner.channel.observe(Arc::clone(&observer));
        inner.transactions.observe(Arc::clone(&observer));
        inner.endpoints.observe(observer);

        inner.transactions.start_reaper().await;
        Ok(())
    }

    /// Closes the channel, unregisters from all publishers and abandons any
    /// in-flight transactions: running commands are not cancelled, but their
    /// late responses will find an empty registry. Safe to call with work in
    /// flight; a later `activate` starts from a clean slate.
    pub async fn deactivate(&self) -> Result<()> {
        let inner = &self.inner;
        if inner
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ControllerError::AlreadyInactive);
        }

        if let Err(e) = inner.channel.close().await {
            warn!("error closing MGCP channel: {}", e);
        }

        let observer = Arc::clone(inner) as Arc<dyn MgcpMessageObserver>;
        inner.channel.forget(&observer);
        inner.transactions.forget(&observer);
        inner.endpoints.forget(&observer);

        inner.transactions.stop_reaper().await;
        inner.transactions.clear();

        info!("MGCP controller is inactive");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }
}

impl ControllerInner {
    async fn on_incoming_request(&self, from: SocketAddr, to: SocketAddr, request: MgcpRequest) {
        let command =
            self.commands
                .provide(request.verb, request.transaction_id, &request.parameters);

        match self.transactions.process_request(
            from,
            to,
            &request,
            Some(command),
            MessageDirection::Incoming,
        ) {
            RequestOutcome::Started => {}
            RequestOutcome::Duplicate => {
                // Transaction is already being executed; answer with a
                // provisional instead of running the command again.
                let provisional = ResponseCode::TransactionBeingExecuted;
                debug!(
                    "received duplicate request tx={} from {}; sending provisional response with code {}",
                    request.transaction_id,
                    from,
                    provisional.code()
                );
                self.transmit(
                    MgcpMessage::Response(MgcpResponse::from_code(
                        request.transaction_id,
                        provisional,
                    )),
                    from,
                )
                .await;
            }
            RequestOutcome::AlreadyCompleted(stored) => {
                debug!(
                    "received retransmission of completed tx={} from {}; replaying stored response",
                    request.transaction_id, from
                );
                self.transmit(MgcpMessage::Response(stored), from).await;
            }
        }
    }

    async fn on_outgoing_request(&self, from: SocketAddr, to: SocketAddr, request: MgcpRequest) {
        match self
            .transactions
            .process_request(from, to, &request, None, MessageDirection::Outgoing)
        {
            RequestOutcome::Started => {
                self.transmit(MgcpMessage::Request(request), to).await;
            }
            RequestOutcome::Duplicate | RequestOutcome::AlreadyCompleted(_) => {
                // A duplicate outbound id is an upstream bug, not a network
                // event; the request must not reach the wire.
                error!(
                    "duplicate outbound transaction tx={}; request won't be sent to {}",
                    request.transaction_id, to
                );
            }
        }
    }

    async fn on_incoming_response(&self, from: SocketAddr, to: SocketAddr, response: MgcpResponse) {
        match self
            .transactions
            .process_response(from, to, &response, MessageDirection::Incoming)
        {
            ResponseOutcome::Completed => {}
            ResponseOutcome::NotFound => {
                warn!(
                    "response tx={} from {} matches no transaction; dropping",
                    response.transaction_id, from
                );
            }
        }
    }

    async fn on_outgoing_response(&self, from: SocketAddr, to: SocketAddr, response: MgcpResponse) {
        match self
            .transactions
            .process_response(from, to, &response, MessageDirection::Outgoing)
        {
            ResponseOutcome::Completed => {
                self.transmit(MgcpMessage::Response(response), to).await;
            }
            ResponseOutcome::NotFound => {
                error!(
                    "transaction tx={} is unknown; response won't be sent to {}",
                    response.transaction_id, to
                );
            }
        }
    }

    /// Fire-and-forget transmission: a send failure is logged with enough
    /// context to diagnose and never retried here. Retransmission policy
    /// belongs to the call agent, not this core.
    async fn transmit(&self, message: MgcpMessage, destination: SocketAddr) {
        if let Err(e) = self.channel.send(&message, destination).await {
            error!(
                "could not send MGCP message tx={} to {}: {}",
                message.transaction_id(),
                destination,
                e
            );
        }
    }
}

#[async_trait]
impl MgcpMessageObserver for ControllerInner {
    async fn on_message(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    ) {
        match direction {
            MessageDirection::Incoming => match message {
                MgcpMessage::Request(request) => self.on_incoming_request(from, to, request).await,
                MgcpMessage::Response(response) => {
                    self.on_incoming_response(from, to, response).await
                }
            },
            MessageDirection::Outgoing => match message {
                MgcpMessage::Request(request) => self.on_outgoing_request(from, to, request).await,
                MgcpMessage::Response(response) => {
                    self.on_outgoing_response(from, to, response).await
                }
            },
        }
    }
}
