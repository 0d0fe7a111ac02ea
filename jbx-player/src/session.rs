//! Session manager
//!
//! **Responsibilities:**
//! - One owned map from tenant id to its session (queue + controller); no
//!   ambient global state
//! - Routing user actions through the event serializer so concurrent
//!   interactions on one display never interleave
//! - Feeding sink completion signals back into the controller
//! - Teardown: a session's `dead` flag turns every stale async completion
//!   into a no-op, and all pending timers/workers are dropped with it

use crate::commands::{Command, CommandContext, DEFAULT_JUMP_SECS};
use crate::coordinator::{RefreshPayload, RefreshRequest, UpdateCoordinator};
use crate::error::{Error, Result};
use crate::playback::{AudioSink, PlaybackController, PlaybackSignal};
use crate::queue::{AppendOutcome, SongQueue};
use crate::resolver::{SongResolver, Track};
use crate::serializer::EventSerializer;
use jbx_common::events::{PlaybackState, PlayerEvent};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Builds the per-tenant audio resource, wired to a signal channel
pub trait SinkFactory: Send + Sync {
    fn create(
        &self,
        tenant_id: &str,
        signals: mpsc::UnboundedSender<PlaybackSignal>,
    ) -> Arc<dyn AudioSink>;
}

/// Decides whether an actor may operate on a tenant's queue
///
/// Denials abort the action before any side effect; role semantics live
/// entirely behind this seam.
#[async_trait::async_trait]
pub trait ActionGate: Send + Sync {
    async fn can_act(&self, actor_id: &str, tenant_id: &str) -> bool;
}

/// Gate that allows every actor
pub struct AllowAll;

#[async_trait::async_trait]
impl ActionGate for AllowAll {
    async fn can_act(&self, _actor_id: &str, _tenant_id: &str) -> bool {
        true
    }
}

/// Per-tenant state: exclusively owned by its tenant key
pub struct Session {
    pub queue: SongQueue,
    pub controller: PlaybackController,
}

struct SessionHandle {
    session: Arc<Mutex<Session>>,
    dead: Arc<AtomicBool>,
    drain: JoinHandle<()>,
}

/// Owns every tenant session and the shared coordination machinery
pub struct SessionManager {
    db: SqlitePool,
    resolver: Arc<dyn SongResolver>,
    sinks: Arc<dyn SinkFactory>,
    gate: Arc<dyn ActionGate>,
    coordinator: Arc<UpdateCoordinator>,
    serializer: EventSerializer,
    events: broadcast::Sender<PlayerEvent>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        db: SqlitePool,
        resolver: Arc<dyn SongResolver>,
        sinks: Arc<dyn SinkFactory>,
        gate: Arc<dyn ActionGate>,
        writer: Arc<dyn crate::coordinator::DisplayWriter>,
        debounce_window: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(100);
        Arc::new(Self {
            db,
            resolver,
            sinks,
            gate,
            coordinator: Arc::new(UpdateCoordinator::new(writer, debounce_window)),
            serializer: EventSerializer::new(),
            events,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Subscribe to the player event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PlayerEvent) {
        // Ignore send errors (no subscribers is OK)
        let _ = self.events.send(event);
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Get or create the tenant's session
    pub async fn session(&self, tenant_id: &str, owner_id: &str) -> Result<Arc<Mutex<Session>>> {
        if let Some(handle) = self.sessions.read().await.get(tenant_id) {
            return Ok(Arc::clone(&handle.session));
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock
        if let Some(handle) = sessions.get(tenant_id) {
            return Ok(Arc::clone(&handle.session));
        }

        info!("Creating session for tenant {}", tenant_id);
        let queue = SongQueue::load(self.db.clone(), tenant_id, owner_id).await?;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let sink = self.sinks.create(tenant_id, signal_tx);
        let controller = PlaybackController::new(tenant_id, sink, self.events.clone());

        let session = Arc::new(Mutex::new(Session { queue, controller }));
        let dead = Arc::new(AtomicBool::new(false));
        let drain = self.spawn_signal_drain(tenant_id, Arc::clone(&session), Arc::clone(&dead), signal_rx);

        sessions.insert(
            tenant_id.to_string(),
            SessionHandle {
                session: Arc::clone(&session),
                dead,
                drain,
            },
        );
        Ok(session)
    }

    /// Feed sink signals into the controller; one single-owner task per
    /// session, so controller callbacks never race user actions
    fn spawn_signal_drain(
        &self,
        tenant_id: &str,
        session: Arc<Mutex<Session>>,
        dead: Arc<AtomicBool>,
        mut signals: mpsc::UnboundedReceiver<PlaybackSignal>,
    ) -> JoinHandle<()> {
        let tenant_id = tenant_id.to_string();
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                // Stale completions after teardown become no-ops
                if dead.load(Ordering::SeqCst) {
                    break;
                }
                let mut guard = session.lock().await;
                let Session { queue, controller } = &mut *guard;
                if let Err(e) = controller.handle_signal(signal, queue).await {
                    warn!("Signal handling failed for tenant {}: {}", tenant_id, e);
                }
                drop(guard);
                coordinator.submit(&tenant_id, RefreshRequest::new(RefreshPayload::Full));
            }
            debug!("Signal drain finished for tenant {}", tenant_id);
        })
    }

    /// Resolve a query and enqueue the results; starts playback if idle
    pub async fn resolve_and_enqueue(
        self: &Arc<Self>,
        tenant_id: &str,
        owner_id: &str,
        query: &str,
        to_front: bool,
    ) -> Result<Option<AppendOutcome>> {
        self.check_gate(owner_id, tenant_id).await?;
        let tracks = match self.resolver.resolve(query).await? {
            Some(tracks) if !tracks.is_empty() => tracks,
            _ => return Ok(None),
        };
        let outcome = self
            .songs_resolved(tenant_id, owner_id, &tracks, to_front)
            .await?;
        Ok(Some(outcome))
    }

    /// Append resolved tracks to the tenant's queue
    ///
    /// Queued behind any pending action on the same display key, so an
    /// append never interleaves with a command; waits for its turn and
    /// returns the append outcome.
    pub async fn songs_resolved(
        self: &Arc<Self>,
        tenant_id: &str,
        owner_id: &str,
        tracks: &[Track],
        to_front: bool,
    ) -> Result<AppendOutcome> {
        let session = self.session(tenant_id, owner_id).await?;
        let key = self.serializer_key(&session, tenant_id).await;

        let (done_tx, done_rx) = oneshot::channel();
        let manager = Arc::clone(self);
        let tenant = tenant_id.to_string();
        let tracks = tracks.to_vec();
        self.serializer.enqueue(&key, async move {
            let result = if manager.is_dead(&tenant).await {
                Err(Error::NotFound(format!("No session for tenant {}", tenant)))
            } else {
                manager.apply_append(&tenant, &session, &tracks, to_front).await
            };
            let _ = done_tx.send(result);
        });

        match done_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::Internal("append task dropped".to_string())),
        }
    }

    async fn apply_append(
        &self,
        tenant_id: &str,
        session: &Arc<Mutex<Session>>,
        tracks: &[Track],
        to_front: bool,
    ) -> Result<AppendOutcome> {
        let mut guard = session.lock().await;
        let outcome = guard.queue.append_songs(tracks, to_front).await?;

        if let AppendOutcome::Appended(n) = outcome {
            if n > 0 {
                self.emit(PlayerEvent::QueueChanged {
                    tenant_id: tenant_id.to_string(),
                    timestamp: chrono::Utc::now(),
                });

                // Idle queue with a fresh head starts playing
                if guard.controller.state() == PlaybackState::Idle {
                    if let Some(head) = guard.queue.head().await? {
                        let Session { queue, controller } = &mut *guard;
                        if let Err(e) = controller.play(head, 0).await {
                            warn!("Initial play failed for tenant {}: {}", tenant_id, e);
                            let _ = controller.handle_signal(
                                PlaybackSignal::Failed(e.to_string()),
                                queue,
                            )
                            .await;
                        }
                    }
                }
            }
        }
        drop(guard);

        self.queue_needs_refresh(tenant_id, RefreshPayload::Full);
        Ok(outcome)
    }

    /// Interactions on one display serialize on its message reference;
    /// falls back to the tenant key before a display exists
    async fn serializer_key(&self, session: &Arc<Mutex<Session>>, tenant_id: &str) -> String {
        let guard = session.lock().await;
        guard.queue.message_ref().unwrap_or(tenant_id).to_string()
    }

    /// Run a named command for a tenant, serialized per display message
    ///
    /// The command is queued behind any other pending action on the same
    /// display and executed in arrival order; this call returns once it is
    /// enqueued, not once it ran.
    pub async fn run_command(
        self: &Arc<Self>,
        name: &str,
        tenant_id: &str,
        owner_id: &str,
    ) -> Result<()> {
        let command = Command::from_name(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown command: {}", name)))?;
        self.check_gate(owner_id, tenant_id).await?;

        let session = self.session(tenant_id, owner_id).await?;
        let key = self.serializer_key(&session, tenant_id).await;

        let manager = Arc::clone(self);
        let tenant = tenant_id.to_string();
        self.serializer.enqueue(&key, async move {
            if manager.is_dead(&tenant).await {
                return;
            }

            let stop_armed = {
                let mut guard = session.lock().await;
                let stop_armed = command == Command::Stop
                    && guard.queue.has_option(jbx_common::db::QueueOption::StopSelected);
                let Session { queue, controller } = &mut *guard;
                let mut ctx = CommandContext {
                    queue,
                    controller,
                    jump_secs: DEFAULT_JUMP_SECS,
                    skip_count: 1,
                };
                if let Err(e) = command.execute(&mut ctx).await {
                    warn!("Command {} failed for tenant {}: {}", command.name(), tenant, e);
                }
                stop_armed
            };

            if stop_armed {
                // Second press of Stop tears the whole session down
                if let Err(e) = manager.destroy(&tenant).await {
                    warn!("Session teardown failed for tenant {}: {}", tenant, e);
                }
            } else {
                manager.emit(PlayerEvent::QueueChanged {
                    tenant_id: tenant.clone(),
                    timestamp: chrono::Utc::now(),
                });
                manager.queue_needs_refresh(&tenant, RefreshPayload::Full);
            }
        });

        Ok(())
    }

    /// Request a debounced display refresh (fire-and-forget)
    pub fn queue_needs_refresh(&self, tenant_id: &str, payload: RefreshPayload) {
        self.coordinator
            .submit(tenant_id, RefreshRequest::new(payload));
    }

    async fn check_gate(&self, actor_id: &str, tenant_id: &str) -> Result<()> {
        if self.gate.can_act(actor_id, tenant_id).await {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "Actor {} may not act on tenant {}",
                actor_id, tenant_id
            )))
        }
    }

    async fn is_dead(&self, tenant_id: &str) -> bool {
        match self.sessions.read().await.get(tenant_id) {
            Some(handle) => handle.dead.load(Ordering::SeqCst),
            None => true,
        }
    }

    /// Tear down the tenant's session: stop playback, delete persisted
    /// state, cancel pending coordinator windows, dead-flag stale callbacks
    pub async fn destroy(&self, tenant_id: &str) -> Result<()> {
        let handle = match self.sessions.write().await.remove(tenant_id) {
            Some(handle) => handle,
            None => return Err(Error::NotFound(format!("No session for tenant {}", tenant_id))),
        };

        handle.dead.store(true, Ordering::SeqCst);
        handle.drain.abort();
        self.coordinator.drop_tenant(tenant_id);

        {
            let mut guard = handle.session.lock().await;
            guard.controller.kill().await;
            guard.queue.destroy().await?;
        }

        self.emit(PlayerEvent::SessionDestroyed {
            tenant_id: tenant_id.to_string(),
            timestamp: chrono::Utc::now(),
        });
        info!("Session destroyed for tenant {}", tenant_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::DisplayWriter;
    use crate::queue::store;
    use async_trait::async_trait;
    use jbx_common::db::init_memory_database;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct OkSink;

    #[async_trait]
    impl AudioSink for OkSink {
        async fn play(&self, _locator: &str, _start_at_secs: u64) -> Result<()> {
            Ok(())
        }
        async fn stop(&self) {}
        async fn pause(&self) {}
        async fn resume(&self) {}
        async fn release(&self) {}
    }

    struct OkSinkFactory;

    impl SinkFactory for OkSinkFactory {
        fn create(
            &self,
            _tenant_id: &str,
            _signals: mpsc::UnboundedSender<PlaybackSignal>,
        ) -> Arc<dyn AudioSink> {
            Arc::new(OkSink)
        }
    }

    struct FixedResolver(Vec<Track>);

    #[async_trait]
    impl SongResolver for FixedResolver {
        async fn resolve(&self, _query: &str) -> Result<Option<Vec<Track>>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.clone()))
            }
        }
    }

    struct CountingWriter(AtomicUsize);

    #[async_trait]
    impl DisplayWriter for CountingWriter {
        async fn write(&self, _tenant_id: &str, _payload: RefreshPayload) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn track(name: &str) -> Track {
        Track {
            name: name.to_string(),
            short_name: None,
            locator: format!("source://{}", name),
            duration_secs: 120,
        }
    }

    async fn manager(tracks: Vec<Track>) -> (Arc<SessionManager>, Arc<CountingWriter>) {
        let db = init_memory_database().await.unwrap();
        let writer = Arc::new(CountingWriter(AtomicUsize::new(0)));
        let manager = SessionManager::new(
            db,
            Arc::new(FixedResolver(tracks)),
            Arc::new(OkSinkFactory),
            Arc::new(AllowAll),
            writer.clone(),
            Duration::from_millis(10),
        );
        (manager, writer)
    }

    struct DenyAll;

    #[async_trait]
    impl ActionGate for DenyAll {
        async fn can_act(&self, _actor_id: &str, _tenant_id: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_resolve_and_enqueue_starts_playback() {
        let (manager, _) = manager(vec![track("a"), track("b")]).await;

        let outcome = manager
            .resolve_and_enqueue("g1", "u1", "some song", false)
            .await
            .unwrap();
        assert_eq!(outcome, Some(AppendOutcome::Appended(2)));

        let session = manager.session("g1", "u1").await.unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.controller.state(), PlaybackState::Playing);
        assert_eq!(guard.controller.current().unwrap().name, "a");
    }

    #[tokio::test]
    async fn test_append_waits_behind_pending_action_on_same_key() {
        let (manager, _) = manager(vec![track("a")]).await;
        manager.session("g1", "u1").await.unwrap();

        // Occupy the tenant's serializer key with a long-running action
        let (release_tx, release_rx) = oneshot::channel::<()>();
        manager.serializer.enqueue("g1", async move {
            let _ = release_rx.await;
        });

        let appender = Arc::clone(&manager);
        let append = tokio::spawn(async move {
            appender.resolve_and_enqueue("g1", "u1", "q", false).await
        });

        // While the earlier action runs, the queue must stay untouched
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store::active_count(&manager.db, "g1").await.unwrap(), 0);

        release_tx.send(()).unwrap();
        let outcome = append.await.unwrap().unwrap();
        assert_eq!(outcome, Some(AppendOutcome::Appended(1)));
        assert_eq!(store::active_count(&manager.db, "g1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_query_is_a_noop() {
        let (manager, _) = manager(vec![]).await;
        let outcome = manager
            .resolve_and_enqueue("g1", "u1", "garbage", false)
            .await
            .unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn test_run_command_executes_in_order() {
        let (manager, _) = manager(vec![track("a"), track("b"), track("c")]).await;
        manager
            .resolve_and_enqueue("g1", "u1", "q", false)
            .await
            .unwrap();

        manager.run_command("skip", "g1", "u1").await.unwrap();
        manager.run_command("skip", "g1", "u1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let session = manager.session("g1", "u1").await.unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.controller.current().unwrap().name, "c");
    }

    #[tokio::test]
    async fn test_denied_actor_has_no_effect() {
        let db = init_memory_database().await.unwrap();
        let writer = Arc::new(CountingWriter(AtomicUsize::new(0)));
        let manager = SessionManager::new(
            db,
            Arc::new(FixedResolver(vec![track("a")])),
            Arc::new(OkSinkFactory),
            Arc::new(DenyAll),
            writer,
            Duration::from_millis(10),
        );

        let err = manager
            .resolve_and_enqueue("g1", "u1", "q", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = manager.run_command("skip", "g1", "u1").await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        // Denied before any session was created
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_command_is_rejected() {
        let (manager, _) = manager(vec![]).await;
        let err = manager.run_command("bogus", "g1", "u1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_destroy_clears_state_and_cascades() {
        let (manager, _) = manager(vec![track("a"), track("b")]).await;
        manager
            .resolve_and_enqueue("g1", "u1", "q", false)
            .await
            .unwrap();
        assert_eq!(manager.session_count().await, 1);

        let mut events = manager.subscribe_events();
        manager.destroy("g1").await.unwrap();
        assert_eq!(manager.session_count().await, 0);

        // Songs are gone from the database
        assert_eq!(store::active_count(&manager.db, "g1").await.unwrap(), 0);

        // SessionDestroyed was broadcast
        loop {
            match events.recv().await.unwrap() {
                PlayerEvent::SessionDestroyed { tenant_id, .. } => {
                    assert_eq!(tenant_id, "g1");
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_destroy_unknown_tenant_errors() {
        let (manager, _) = manager(vec![]).await;
        assert!(matches!(
            manager.destroy("nope").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_requests_are_coalesced() {
        let (manager, writer) = manager(vec![]).await;
        manager.queue_needs_refresh("g1", RefreshPayload::Lighter);
        manager.queue_needs_refresh("g1", RefreshPayload::Full);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(writer.0.load(Ordering::SeqCst), 1);
    }
}
