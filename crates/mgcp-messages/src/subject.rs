//! Publish-subscribe contract for MGCP message passing.
//!
//! Every component that sees messages cross the wire (the channel, the
//! transaction manager, the endpoint manager) is a [`MgcpMessageSubject`];
//! anything interested in those messages registers as a
//! [`MgcpMessageObserver`]. This is a narrow but load-bearing seam: every
//! protocol-visible send and receive flows through it.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::message::{MessageDirection, MgcpMessage};

/// Receives notifications about MGCP messages crossing a subject.
///
/// The message is delivered by value; observers cannot mutate what other
/// observers see.
#[async_trait]
pub trait MgcpMessageObserver: Send + Sync {
    async fn on_message(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    );
}

/// Subscribes observers to receive notifications about MGCP message passing.
#[async_trait]
pub trait MgcpMessageSubject: Send + Sync {
    /// Adds an observer. Registering the same observer twice does not
    /// duplicate notifications.
    fn observe(&self, observer: Arc<dyn MgcpMessageObserver>);

    /// Removes an observer. No-op when it was never registered.
    fn forget(&self, observer: &Arc<dyn MgcpMessageObserver>);

    /// Delivers `message` to every currently-registered observer.
    async fn notify(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    );
}

/// Reusable observer registry backing every subject in the stack.
///
/// The registry is read on every message and written only when a component
/// activates or deactivates, so it keeps observers behind an `RwLock` and
/// snapshots them before delivering. Observers may register or unregister
/// from inside a notification; the in-flight delivery still reaches everyone
/// that was registered when it started.
#[derive(Default)]
pub struct MessageBus {
    observers: RwLock<Vec<Arc<dyn MgcpMessageObserver>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, observer: Arc<dyn MgcpMessageObserver>) {
        let mut observers = self.observers.write().expect("observer registry poisoned");
        if !observers.iter().any(|o| same_observer(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn forget(&self, observer: &Arc<dyn MgcpMessageObserver>) {
        let mut observers = self.observers.write().expect("observer registry poisoned");
        observers.retain(|o| !same_observer(o, observer));
    }

    pub async fn notify(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        message: MgcpMessage,
        direction: MessageDirection,
    ) {
        let snapshot = self
            .observers
            .read()
            .expect("observer registry poisoned")
            .clone();
        for observer in snapshot {
            observer
                .on_message(from, to, message.clone(), direction)
                .await;
        }
    }
}

/// Observer identity is the allocation address, compared as a thin pointer so
/// two `Arc`s to the same value always agree.
fn same_observer(a: &Arc<dyn MgcpMessageObserver>, b: &Arc<dyn MgcpMessageObserver>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MgcpResponse, ResponseCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        seen: AtomicUsize,
        directions: Mutex<Vec<MessageDirection>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Recorder {
                seen: AtomicUsize::new(0),
                directions: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MgcpMessageObserver for Recorder {
        async fn on_message(
            &self,
            _from: SocketAddr,
            _to: SocketAddr,
            _message: MgcpMessage,
            direction: MessageDirection,
        ) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.directions.lock().unwrap().push(direction);
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn probe() -> MgcpMessage {
        MgcpMessage::Response(MgcpResponse::from_code(9, ResponseCode::TransactionWasExecuted))
    }

    #[tokio::test]
    async fn delivers_to_all_registered_observers() {
        let bus = MessageBus::new();
        let first = Recorder::new();
        let second = Recorder::new();
        bus.observe(first.clone());
        bus.observe(second.clone());

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Incoming)
            .await;

        assert_eq!(first.seen.load(Ordering::SeqCst), 1);
        assert_eq!(second.seen.load(Ordering::SeqCst), 1);
        assert_eq!(
            *first.directions.lock().unwrap(),
            vec![MessageDirection::Incoming]
        );
    }

    #[tokio::test]
    async fn double_registration_notifies_once() {
        let bus = MessageBus::new();
        let recorder = Recorder::new();
        bus.observe(recorder.clone());
        bus.observe(recorder.clone());

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Outgoing)
            .await;

        assert_eq!(recorder.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forgotten_observer_receives_nothing() {
        let bus = MessageBus::new();
        let recorder = Recorder::new();
        bus.observe(recorder.clone());
        bus.forget(&(recorder.clone() as Arc<dyn MgcpMessageObserver>));

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Incoming)
            .await;

        assert_eq!(recorder.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forgetting_an_unregistered_observer_is_a_no_op() {
        let bus = MessageBus::new();
        let registered = Recorder::new();
        let stranger = Recorder::new();
        bus.observe(registered.clone());
        bus.forget(&(stranger as Arc<dyn MgcpMessageObserver>));

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Incoming)
            .await;

        assert_eq!(registered.seen.load(Ordering::SeqCst), 1);
    }

    /// An observer that unregisters another observer mid-notification. The
    /// in-flight delivery must still complete without skipping anyone.
    struct Saboteur {
        bus: Arc<MessageBus>,
        victim: Mutex<Option<Arc<dyn MgcpMessageObserver>>>,
    }

    #[async_trait]
    impl MgcpMessageObserver for Saboteur {
        async fn on_message(
            &self,
            _from: SocketAddr,
            _to: SocketAddr,
            _message: MgcpMessage,
            _direction: MessageDirection,
        ) {
            if let Some(victim) = self.victim.lock().unwrap().take() {
                self.bus.forget(&victim);
            }
        }
    }

    #[tokio::test]
    async fn unregistering_during_notification_does_not_lose_the_in_flight_delivery() {
        let bus = Arc::new(MessageBus::new());
        let victim = Recorder::new();
        let saboteur = Arc::new(Saboteur {
            bus: bus.clone(),
            victim: Mutex::new(Some(victim.clone() as Arc<dyn MgcpMessageObserver>)),
        });

        bus.observe(saboteur);
        bus.observe(victim.clone());

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Incoming)
            .await;
        assert_eq!(victim.seen.load(Ordering::SeqCst), 1);

        bus.notify(addr(2427), addr(2727), probe(), MessageDirection::Incoming)
            .await;
        assert_eq!(victim.seen.load(Ordering::SeqCst), 1);
    }
}
