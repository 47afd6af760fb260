use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use mgcp_messages::{
    MessageBus, MessageDirection, MgcpMessage, MgcpMessageObserver, MgcpMessageSubject,
    MgcpRequest, MgcpResponse,
};

use crate::command::MgcpCommand;
use crate::transaction::{RequestOutcome, ResponseOutcome, TransactionConfig};

/// One tracked transaction. Owned exclusively by the manager; the controller
/// only ever sees outcomes.
struct Transaction {
    from: SocketAddr,
    to: SocketAddr,
    opened: MessageDirection,
    created_at: Instant,
    state: TransactionState,
}

/// A completed transaction keeps its response; the type makes a completed
/// record without one unrepresentable.
enum TransactionState {
    Pending,
    Completed {
        response: MgcpResponse,
        at: Instant,
    },
}

impl Transaction {
    fn open(from: SocketAddr, to: SocketAddr, opened: MessageDirection) -> Self {
        Transaction {
            from,
            to,
            opened,
            created_at: Instant::now(),
            state: TransactionState::Pending,
        }
    }
}

/// The transaction state machine.
///
/// Owns the registry of in-flight transactions, decides new/duplicate/
/// unmatched for every message routed through it, and drives each incoming
/// transaction's command to execution. The manager is itself a message
/// publisher: when a spawned command finishes, its response is published
/// `Outgoing` to the manager's observers, which is how command results
/// re-enter the controller's dispatch.
#[derive(Clone)]
pub struct MgcpTransactionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: TransactionConfig,
    transactions: DashMap<u32, Transaction>,
    bus: MessageBus,
    reaper: Mutex<Option<Reaper>>,
}

struct Reaper {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MgcpTransactionManager {
    pub fn new(config: TransactionConfig) -> Self {
        MgcpTransactionManager {
            inner: Arc::new(ManagerInner {
                config,
                transactions: DashMap::new(),
                bus: MessageBus::new(),
                reaper: Mutex::new(None),
            }),
        }
    }

    /// Routes a request. The absent→pending transition happens atomically on
    /// the registry entry; a command is only consumed when the transaction
    /// actually starts (outgoing requests carry none).
    pub fn process_request(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        request: &MgcpRequest,
        command: Option<Box<dyn MgcpCommand>>,
        direction: MessageDirection,
    ) -> RequestOutcome {
        let id = request.transaction_id;
        let outcome = match self.inner.transactions.entry(id) {
            Entry::Occupied(entry) => {
                let transaction = entry.get();
                match &transaction.state {
                    TransactionState::Pending => {
                        debug!(
                            "tx={} is already pending ({} request {} -> {}, {}ms old)",
                            id,
                            transaction.opened,
                            transaction.from,
                            transaction.to,
                            transaction.created_at.elapsed().as_millis()
                        );
                        RequestOutcome::Duplicate
                    }
                    TransactionState::Completed { response, .. } => {
                        RequestOutcome::AlreadyCompleted(response.clone())
                    }
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Transaction::open(from, to, direction));
                RequestOutcome::Started
            }
        };

        if outcome == RequestOutcome::Started {
            debug!(
                "opened {} transaction tx={} ({} -> {})",
                direction, id, from, to
            );
            if let Some(command) = command {
                self.spawn_execution(id, from, to, command);
            }
        }
        outcome
    }

    /// Routes a response. A pending transaction transitions to completed and
    /// keeps the response for duplicate replay; anything else is unmatched.
    pub fn process_response(
        &self,
        from: SocketAddr,
        to: SocketAddr,
        response: &MgcpResponse,
        direction: MessageDirection,
    ) -> ResponseOutcome {
        let id = response.transaction_id;
        match self.inner.transactions.get_mut(&id) {
            Some(mut transaction) if matches!(transaction.state, TransactionState::Pending) => {
                transaction.state = TransactionState::Completed {
                    response: response.clone(),
                    at: Instant::now(),
                };
                debug!(
                    "closed transaction tx={} with code {} ({} {} -> {})",
                    id, response.code, direction, from, to
                );
                ResponseOutcome::Completed
            }
            _ => ResponseOutcome::NotFound,
        }
    }

    /// Executes the command off the registry lock and publishes its response
    /// `Outgoing`, addressed back the way the request came.
    fn spawn_execution(&self, id: u32, from: SocketAddr, to: SocketAddr, command: Box<dyn MgcpCommand>) {
        let manager = self.clone();
        tokio::spawn(async move {
            let result = command.execute().await;
            let response = MgcpResponse {
                transaction_id: id,
                code: result.code,
                comment: result.comment,
                parameters: result.parameters,
            };
            manager
                .inner
                .bus
                .notify(to, from, MgcpMessage::Response(response), MessageDirection::Outgoing)
                .await;
        });
    }

    /// Removes completed transactions past the retention window.
    pub fn evict_expired(&self) {
        let retention = self.inner.config.retention;
        let now = Instant::now();
        self.inner.transactions.retain(|id, transaction| match &transaction.state {
            TransactionState::Pending => true,
            TransactionState::Completed { at, .. } => {
                let keep = now.duration_since(*at) < retention;
                if !keep {
                    debug!("evicting completed transaction tx={}", id);
                }
                keep
            }
        });
    }

    /// Empties the registry. In-flight command executions are not cancelled;
    /// their late responses will simply find no transaction.
    pub fn clear(&self) {
        let abandoned = self.inner.transactions.len();
        self.inner.transactions.clear();
        if abandoned > 0 {
            info!("cleared {} transaction(s); in-flight executions are abandoned", abandoned);
        }
    }

    /// Starts the periodic eviction sweep. Idempotent.
    pub async fn start_reaper(&self) {
        let mut reaper = self.inner.reaper.lock().await;
        if reaper.is_some() {
            return;
        }
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = self.clone();
        let period = self.inner.config.reap_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => manager.evict_expired(),
                }
            }
            debug!("transaction reaper stopped");
        });
        *reaper = Some(Reaper { shutdown_tx, task });
    }

    /// Stops the eviction sweep and waits for it to wind down. No-op when it
    /// was never started.
    pub async fn stop_reaper(&self) {
        let reaper = self.inner.reaper.lock().await.take();
        if let Some(reaper) = reaper {
            let _ = reaper.shutdown_tx.send(true);
            let _ = reaper.task.await;
        }
    }

    /// Number of transactions currently pending.
    pub fn pending_count(&self) -> usize {
        self.inner
            .transactions
            .iter()
            .filter(|t| matches!(t.state, TransactionState::Pending))
            .count()
    }

    /// Whether any record (pending or retained) exists for the id.
    pub fn contains(&self, transaction_id: u32) -> bool {
        self.inner.transactions.contains_key(&transaction_id)
    }

    /// Age of the oldest pending transaction, if any. Diagnostic surface for
    /// supervision layers.
    pub fn oldest_pending(&self) -> Option<std::time::Duration> {
        let now = Instant::now();
        self.inner
            .transactions
            .iter()
            .filter(|t| matches!(t.state, TransactionState::Pending))
            .map(|t| now.duration_since(t.created_at))
            .max()
    }
}

#[async_trait]
impl MgcpMessageSubject for MgcpTransactionManager {
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
