//! Update coordinator
//!
//! **Responsibilities:**
//! - Debounce concurrent "refresh the external display" requests per tenant
//! - Merge payload fidelity (a Full request upgrades a pending Lighter one)
//! - Accumulate completion callbacks and resolve all of them after the one
//!   external write the window collapses into
//! - Guarantee at most one in-flight external write per tenant
//!
//! One worker task per tenant, fed by an mpsc channel: the worker collects
//! requests until the debounce deadline, performs a single write, resolves
//! the callbacks, and waits for the next window. Serial writes per tenant
//! fall out of the single-worker construction.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default debounce window before the merged write executes
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// Fidelity of a display refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefreshPayload {
    /// Cheap partial update
    Lighter,
    /// Full re-render
    Full,
}

/// Callback resolved once the merged write completes
pub type RefreshCallback = oneshot::Sender<std::result::Result<(), String>>;

/// One refresh request from a caller
pub struct RefreshRequest {
    pub payload: RefreshPayload,
    /// Overrides the default window; honored for the request that opens a
    /// window, ignored for requests merging into one
    pub window: Option<Duration>,
    /// Resolved with the write outcome; None for fire-and-forget callers
    pub done: Option<RefreshCallback>,
}

impl RefreshRequest {
    pub fn new(payload: RefreshPayload) -> Self {
        Self {
            payload,
            window: None,
            done: None,
        }
    }
}

/// Performs the actual external display write
#[async_trait]
pub trait DisplayWriter: Send + Sync {
    async fn write(&self, tenant_id: &str, payload: RefreshPayload) -> Result<()>;
}

struct TenantWorker {
    tx: mpsc::UnboundedSender<RefreshRequest>,
    handle: JoinHandle<()>,
}

/// Debounced, per-tenant dispatcher for external display writes
pub struct UpdateCoordinator {
    writer: Arc<dyn DisplayWriter>,
    default_window: Duration,
    workers: Mutex<HashMap<String, TenantWorker>>,
}

impl UpdateCoordinator {
    pub fn new(writer: Arc<dyn DisplayWriter>, default_window: Duration) -> Self {
        Self {
            writer,
            default_window,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Submit a refresh request; it either opens a new debounce window for
    /// the tenant or merges into the pending one.
    pub fn submit(&self, tenant_id: &str, request: RefreshRequest) {
        let mut workers = self.workers.lock().expect("coordinator lock poisoned");

        // Re-spawn if the tenant has no worker or its task has finished
        let stale = workers
            .get(tenant_id)
            .map(|w| w.handle.is_finished())
            .unwrap_or(true);
        if stale {
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = tokio::spawn(run_worker(
                tenant_id.to_string(),
                rx,
                Arc::clone(&self.writer),
                self.default_window,
            ));
            workers.insert(tenant_id.to_string(), TenantWorker { tx, handle });
        }

        let worker = workers.get(tenant_id).expect("worker just ensured");
        if worker.tx.send(request).is_err() {
            warn!("Refresh request dropped for tenant {}", tenant_id);
        }
    }

    /// Submit a request and wait for the merged write to complete
    ///
    /// Convenience for callers that need the outcome; equivalent to wiring
    /// a oneshot callback by hand.
    pub async fn submit_and_wait(&self, tenant_id: &str, payload: RefreshPayload) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.submit(
            tenant_id,
            RefreshRequest {
                payload,
                window: None,
                done: Some(tx),
            },
        );
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::ExternalWrite(e)),
            Err(_) => Err(Error::ExternalWrite("refresh cancelled".to_string())),
        }
    }

    /// Cancel any pending window and drop the tenant's worker (teardown)
    pub fn drop_tenant(&self, tenant_id: &str) {
        let mut workers = self.workers.lock().expect("coordinator lock poisoned");
        if let Some(worker) = workers.remove(tenant_id) {
            worker.handle.abort();
            debug!("Dropped coordinator worker for tenant {}", tenant_id);
        }
    }
}

/// Collect-merge-write loop for one tenant
async fn run_worker(
    tenant_id: String,
    mut rx: mpsc::UnboundedReceiver<RefreshRequest>,
    writer: Arc<dyn DisplayWriter>,
    default_window: Duration,
) {
    while let Some(first) = rx.recv().await {
        let window = first.window.unwrap_or(default_window);
        let mut payload = first.payload;
        let mut callbacks: Vec<RefreshCallback> = first.done.into_iter().collect();
        let mut channel_closed = false;

        let deadline = Instant::now() + window;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        // Merge everything that arrives before the deadline
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                next = rx.recv() => match next {
                    Some(request) => {
                        payload = payload.max(request.payload);
                        callbacks.extend(request.done);
                    }
                    None => {
                        channel_closed = true;
                        break;
                    }
                },
            }
        }

        // Exactly one external write per window
        let outcome = match writer.write(&tenant_id, payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Display may go stale; never propagated upward
                warn!("External write failed for tenant {}: {}", tenant_id, e);
                Err(e.to_string())
            }
        };

        for callback in callbacks {
            // Receiver may be gone; that's fine
            let _ = callback.send(outcome.clone());
        }

        if channel_closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        writes: AtomicUsize,
        payloads: Mutex<Vec<RefreshPayload>>,
        fail: bool,
    }

    impl CountingWriter {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                writes: AtomicUsize::new(0),
                payloads: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl DisplayWriter for CountingWriter {
        async fn write(&self, _tenant_id: &str, payload: RefreshPayload) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().unwrap().push(payload);
            if self.fail {
                Err(Error::ExternalWrite("write rejected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn coordinator(writer: Arc<CountingWriter>) -> UpdateCoordinator {
        UpdateCoordinator::new(writer, Duration::from_millis(30))
    }

    #[tokio::test]
    async fn test_requests_in_one_window_produce_one_write() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Lighter,
                window: None,
                done: Some(tx1),
            },
        );
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Lighter,
                window: None,
                done: Some(tx2),
            },
        );

        // Both callbacks fire exactly once, after a single write
        assert_eq!(rx1.await.unwrap(), Ok(()));
        assert_eq!(rx2.await.unwrap(), Ok(()));
        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_payload_upgrades_pending_lighter() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        coord.submit("g1", RefreshRequest::new(RefreshPayload::Lighter));
        coord.submit_and_wait("g1", RefreshPayload::Full)
            .await
            .unwrap();

        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
        assert_eq!(*writer.payloads.lock().unwrap(), vec![RefreshPayload::Full]);
    }

    #[tokio::test]
    async fn test_separate_windows_each_write() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        coord.submit_and_wait("g1", RefreshPayload::Lighter)
            .await
            .unwrap();
        coord.submit_and_wait("g1", RefreshPayload::Lighter)
            .await
            .unwrap();

        assert_eq!(writer.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tenants_are_independent() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        let a = coord.submit_and_wait("g1", RefreshPayload::Lighter);
        let b = coord.submit_and_wait("g2", RefreshPayload::Lighter);
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();

        assert_eq!(writer.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_callback() {
        let writer = CountingWriter::new(true);
        let coord = coordinator(writer.clone());

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Full,
                window: None,
                done: Some(tx1),
            },
        );
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Full,
                window: None,
                done: Some(tx2),
            },
        );

        assert!(rx1.await.unwrap().is_err());
        assert!(rx2.await.unwrap().is_err());
        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_window_override_is_honored() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        let (tx, rx) = oneshot::channel();
        let started = std::time::Instant::now();
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Lighter,
                window: Some(Duration::from_millis(120)),
                done: Some(tx),
            },
        );
        rx.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_drop_tenant_cancels_pending_window() {
        let writer = CountingWriter::new(false);
        let coord = coordinator(writer.clone());

        let (tx, rx) = oneshot::channel();
        coord.submit(
            "g1",
            RefreshRequest {
                payload: RefreshPayload::Full,
                window: Some(Duration::from_millis(100)),
                done: Some(tx),
            },
        );
        coord.drop_tenant("g1");

        // Worker aborted: callback dropped, no write performed
        assert!(rx.await.is_err());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(writer.writes.load(Ordering::SeqCst), 0);
    }
}
