//! Endpoint-manager boundary.
//!
//! Resource management itself lives elsewhere; what matters to the routing
//! core is that the endpoint layer is a message publisher like the channel
//! and the transaction manager. Requests the endpoint layer wants on the
//! wire enter the controller's dispatch through [`publish_request`] tagged
//! [`Outgoing`](MessageDirection::Outgoing).
//!
//! [`publish_request`]: MgcpEndpointManager::publish_request

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use mgcp_messages::{
    MessageBus, MessageDirection, MgcpMessage, MgcpMessageObserver, MgcpMessageSubject, MgcpRequest,
};

#[derive(Default)]
pub struct MgcpEndpointManager {
    bus: MessageBus,
}

impl MgcpEndpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands an outgoing request to whoever observes the endpoint layer.
    ///
    /// `from` is the local address the request originates from, `to` the call
    /// agent it is destined for.
    pub async fn publish_request(&self, from: SocketAddr, to: SocketAddr, request: MgcpRequest) {
        self.bus
            .notify(from, to, MgcpMessage::Request(request), MessageDirection::Outgoing)
            .await;
    }
}

#[async_trait]
impl MgcpMessageSubject for MgcpEndpointManager {
    fn observe(&self, observer: Arc<dyn MgcpMessageObserver>) {
        self.bus.observe(observer);
    }

    fn forget(&self, observer: &Arc<dyn MgcpMessageObserver>) {
        self.bus.forget(observer);
    }

    async fn notify(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    ) {
        self.bus.notify(from, to, message, direction).await;
    }
}
