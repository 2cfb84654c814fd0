//! Serialized send queue.
//!
//! One worker task owns the executor, and with it every cached account and
//! client. Callers only hold a channel sender, so no lock guards the caches:
//! mutation is confined to the worker, which handles one command at a time
//! in arrival order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::blockchain::types::{BlockchainError, Coin};
use crate::dispatch::state::{ChainHealth, TxResult};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error("dispatcher is not running")]
    Closed,
}

/// The work the dispatcher serializes.
#[async_trait]
pub trait TxExecutor: Send + 'static {
    /// Send the configured amount on `chain` to `recipient`.
    async fn send_tx(&mut self, recipient: &str, chain: &str) -> Result<TxResult, DispatchError>;

    /// Probe every configured chain, recreating failed clients when
    /// `reconnect` is set. Never fails; unreachable chains report 0.
    async fn check_and_reconnect_clients(&mut self, reconnect: bool) -> Vec<ChainHealth>;

    /// Balance of the sender account on `chain`, `None` for unknown chains.
    async fn balance(&mut self, chain: &str) -> Result<Option<Coin>, DispatchError>;
}

enum Command {
    Send {
        recipient: String,
        chain: String,
        reply: oneshot::Sender<Result<TxResult, DispatchError>>,
    },
    Probe {
        reconnect: bool,
        reply: oneshot::Sender<Vec<ChainHealth>>,
    },
    Balance {
        chain: String,
        reply: oneshot::Sender<Result<Option<Coin>, DispatchError>>,
    },
}

/// Handle to the dispatcher worker. Cheap to clone.
#[derive(Clone)]
pub struct TransactionDispatcher {
    commands: mpsc::UnboundedSender<Command>,
    depth: Arc<AtomicUsize>,
}

impl TransactionDispatcher {
    /// Start the worker. It exits once every handle has been dropped and
    /// the queue is drained.
    pub fn spawn<E: TxExecutor>(executor: E) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(run(executor, rx, depth.clone()));
        (Self { commands, depth }, handle)
    }

    /// Queue a send and wait for its turn to complete.
    pub async fn enqueue_send(&self, recipient: &str, chain: &str) -> Result<TxResult, DispatchError> {
        let (reply, rx) = oneshot::channel();
        tracing::info!(
            chain = %chain,
            recipient = %recipient,
            queue_length = self.depth.load(Ordering::SeqCst),
            "Enqueue send"
        );
        self.submit(Command::Send {
            recipient: recipient.to_string(),
            chain: chain.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| DispatchError::Closed)?
    }

    /// Probe chain liveness through the worker.
    pub async fn check_and_reconnect_clients(
        &self,
        reconnect: bool,
    ) -> Result<Vec<ChainHealth>, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Probe { reconnect, reply })?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Sender balance on `chain`.
    pub async fn balance(&self, chain: &str) -> Result<Option<Coin>, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Balance {
            chain: chain.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| DispatchError::Closed)?
    }

    /// Commands waiting for or in the worker.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn submit(&self, command: Command) -> Result<(), DispatchError> {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_queue_depth(depth);
        self.commands.send(command).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            DispatchError::Closed
        })
    }
}

impl std::fmt::Debug for TransactionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionDispatcher")
            .field("queue_depth", &self.queue_depth())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run<E: TxExecutor>(
    mut executor: E,
    mut rx: mpsc::UnboundedReceiver<Command>,
    depth: Arc<AtomicUsize>,
) {
    tracing::debug!("Dispatcher worker started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Send {
                recipient,
                chain,
                reply,
            } => {
                tracing::info!(queue_length = depth.load(Ordering::SeqCst), "Processing send");
                let result = executor.send_tx(&recipient, &chain).await;
                match &result {
                    Ok(tx) => metrics::record_transaction(&chain, tx.code),
                    Err(e) => {
                        tracing::error!(chain = %chain, recipient = %recipient, error = %e, "Error processing request")
                    }
                }
                // The requester may have timed out; the result is still final
                let _ = reply.send(result);
            }
            Command::Probe { reconnect, reply } => {
                let report = executor.check_and_reconnect_clients(reconnect).await;
                let _ = reply.send(report);
            }
            Command::Balance { chain, reply } => {
                let _ = reply.send(executor.balance(&chain).await);
            }
        }

        let remaining = depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::record_queue_depth(remaining);
        tracing::info!(queue_length = remaining, "Completed");
    }

    tracing::debug!("Dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records when each send starts and ends.
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TxExecutor for Recorder {
        async fn send_tx(&mut self, recipient: &str, chain: &str) -> Result<TxResult, DispatchError> {
            self.events.lock().unwrap().push(format!("start:{recipient}"));
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.events.lock().unwrap().push(format!("end:{recipient}"));
            if chain == "known" {
                Ok(TxResult::broadcast_ok(recipient.to_string()))
            } else {
                Ok(TxResult::unknown_chain(chain))
            }
        }

        async fn check_and_reconnect_clients(&mut self, _reconnect: bool) -> Vec<ChainHealth> {
            vec![ChainHealth {
                chain: "known".to_string(),
                latest_block: 1,
            }]
        }

        async fn balance(&mut self, chain: &str) -> Result<Option<Coin>, DispatchError> {
            Ok((chain == "known").then(|| Coin::new("uom", "5")))
        }
    }

    #[tokio::test]
    async fn test_sends_run_one_at_a_time_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (dispatcher, _worker) = TransactionDispatcher::spawn(Recorder {
            events: events.clone(),
        });

        let a = dispatcher.enqueue_send("a", "known");
        let b = dispatcher.enqueue_send("b", "known");
        let c = dispatcher.enqueue_send("c", "known");
        let (a, b, c) = tokio::join!(a, b, c);

        assert_eq!(a.unwrap().transaction_hash.as_deref(), Some("a"));
        assert_eq!(b.unwrap().transaction_hash.as_deref(), Some("b"));
        assert_eq!(c.unwrap().transaction_hash.as_deref(), Some("c"));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start:a", "end:a", "start:b", "end:b", "start:c", "end:c"]
        );
        assert_eq!(dispatcher.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_other_commands_share_the_queue() {
        let (dispatcher, _worker) = TransactionDispatcher::spawn(Recorder {
            events: Arc::new(Mutex::new(Vec::new())),
        });

        let report = dispatcher.check_and_reconnect_clients(true).await.unwrap();
        assert_eq!(report[0].latest_block, 1);
        assert_eq!(
            dispatcher.balance("known").await.unwrap(),
            Some(Coin::new("uom", "5"))
        );
        assert_eq!(dispatcher.balance("other").await.unwrap(), None);
        assert_eq!(dispatcher.enqueue_send("x", "other").await.unwrap().code, 999);
    }

    #[tokio::test]
    async fn test_worker_exits_when_handles_dropped() {
        let (dispatcher, worker) = TransactionDispatcher::spawn(Recorder {
            events: Arc::new(Mutex::new(Vec::new())),
        });
        assert!(dispatcher.is_running());
        drop(dispatcher);
        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
