//! Broadcast hub
//!
//! The hub is a single task that owns the subscriber set and the recent
//! history. Every request reaches it through one command queue and is
//! handled to completion before the next, so neither structure needs a lock.
//!
//! ```text
//!   MQTT bridge ──publish──┐
//!                          ▼
//!   WebSocket ──register──► [ command queue ] ──► Hub task
//!   WebSocket ─unregister──►                      ├─ RecentHistory
//!                                                 └─ subscribers
//!                                                      │ try_send
//!                               ┌──────────────────────┼──────────────┐
//!                               ▼                      ▼              ▼
//!                          [queue] relay          [queue] relay   [queue] relay
//! ```
//!
//! The hub never waits on a subscriber. When a session's queue is full the
//! subscriber is dropped and its relay told to stop.

use crate::history::RecentHistory;
use crate::session::{relay, RelayExit, Session, SessionId, VisitSink};
use crate::{Error, Result, Visit};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Depth of the hub's command queue
const COMMAND_QUEUE_DEPTH: usize = 256;

/// Hub sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each session's outbound queue
    pub buffer_size: usize,

    /// Number of recent visits replayed to new sessions
    pub cache_size: usize,
}

impl HubConfig {
    pub fn new(buffer_size: usize, cache_size: usize) -> Self {
        Self {
            buffer_size,
            cache_size,
        }
    }

    /// Check the sizing invariants
    ///
    /// A new session's queue receives the whole history on registration, so
    /// it must hold at least twice the cache to leave room for live traffic.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::config("buffer size must be at least 1"));
        }
        if self.cache_size > self.buffer_size / 2 {
            return Err(Error::config(format!(
                "buffer size ({}) must be at least twice the cache size ({})",
                self.buffer_size, self.cache_size
            )));
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(100, 50)
    }
}

/// Point-in-time view of the hub state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Number of registered sessions
    pub sessions: usize,
    /// Number of visits in the replay cache
    pub cached_visits: usize,
}

/// Requests handled by the hub task
enum HubCommand {
    Register(Subscriber),
    Unregister(SessionId),
    Publish(Arc<Visit>),
    Stats(oneshot::Sender<HubStats>),
    Shutdown,
}

/// The hub's end of a session
struct Subscriber {
    id: SessionId,
    visits: mpsc::Sender<Arc<Visit>>,
    closed: CancellationToken,
}

impl Subscriber {
    /// Enqueue without waiting
    fn offer(&self, visit: &Arc<Visit>) -> std::result::Result<(), TrySendError<Arc<Visit>>> {
        self.visits.try_send(Arc::clone(visit))
    }
}

/// Cloneable handle used to talk to the hub task
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    tracker: TaskTracker,
    next_session_id: Arc<AtomicU64>,
    buffer_size: usize,
}

/// State owned by the hub task
pub struct Hub {
    subscribers: HashMap<SessionId, Subscriber>,
    history: RecentHistory,
    commands: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Validate the configuration and start the hub task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: HubConfig) -> Result<HubHandle> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let hub = Hub {
            subscribers: HashMap::new(),
            history: RecentHistory::new(config.cache_size),
            commands: rx,
        };

        let tracker = TaskTracker::new();
        tracker.spawn(hub.run());

        tracing::info!(
            buffer_size = config.buffer_size,
            cache_size = config.cache_size,
            "Visit hub started"
        );

        Ok(HubHandle {
            commands: tx,
            tracker,
            next_session_id: Arc::new(AtomicU64::new(1)),
            buffer_size: config.buffer_size,
        })
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(subscriber) => self.register(subscriber),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Publish(visit) => self.publish(visit),
                HubCommand::Stats(reply) => {
                    let _ = reply.send(self.stats());
                }
                HubCommand::Shutdown => break,
            }
        }

        for (_, subscriber) in self.subscribers.drain() {
            subscriber.closed.cancel();
        }
        metrics::gauge!("icra_sessions_active").set(0.0);

        tracing::info!("Visit hub stopped");
    }

    fn register(&mut self, subscriber: Subscriber) {
        let id = subscriber.id;

        // Replay oldest first so the session sees history before live visits.
        // The queue is fresh and holds at least twice the cache, so it fits.
        for visit in self.history.snapshot() {
            let _ = subscriber.offer(visit);
        }

        self.subscribers.insert(id, subscriber);
        metrics::counter!("icra_sessions_registered_total").increment(1);
        metrics::gauge!("icra_sessions_active").set(self.subscribers.len() as f64);

        tracing::debug!(
            session_id = id,
            replayed = self.history.len(),
            sessions = self.subscribers.len(),
            "Session registered"
        );
    }

    fn unregister(&mut self, id: SessionId) {
        if let Some(subscriber) = self.subscribers.remove(&id) {
            subscriber.closed.cancel();
            metrics::gauge!("icra_sessions_active").set(self.subscribers.len() as f64);
            tracing::debug!(
                session_id = id,
                sessions = self.subscribers.len(),
                "Session unregistered"
            );
        }
    }

    fn publish(&mut self, visit: Arc<Visit>) {
        self.history.add(Arc::clone(&visit));
        metrics::counter!("icra_visits_published_total").increment(1);

        self.subscribers.retain(|id, subscriber| {
            match subscriber.offer(&visit) {
                Ok(()) => return true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(session_id = *id, "Session too slow, disconnecting");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(session_id = *id, "Session dropped, removing");
                }
            }
            subscriber.closed.cancel();
            false
        });
        metrics::gauge!("icra_sessions_active").set(self.subscribers.len() as f64);
    }

    fn stats(&self) -> HubStats {
        HubStats {
            sessions: self.subscribers.len(),
            cached_visits: self.history.len(),
        }
    }
}

impl HubHandle {
    /// Submit a visit for broadcast
    ///
    /// Waits only for room in the hub's command queue. Visits published
    /// after shutdown are ignored.
    pub async fn publish(&self, visit: Visit) {
        if self
            .commands
            .send(HubCommand::Publish(Arc::new(visit)))
            .await
            .is_err()
        {
            tracing::trace!("Visit published after hub stopped");
        }
    }

    /// Register a new session
    ///
    /// The session first receives the cached history, then every visit
    /// published after it. If the hub has stopped the returned session is
    /// already closed.
    ///
    /// [`HubHandle::shutdown`] waits for the session to be dropped, either
    /// directly or by a relay finishing with it.
    pub async fn register(&self) -> Session {
        let tracked = self.tracker.token();
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let closed = CancellationToken::new();

        let subscriber = Subscriber {
            id,
            visits: tx,
            closed: closed.clone(),
        };
        if self
            .commands
            .send(HubCommand::Register(subscriber))
            .await
            .is_err()
        {
            closed.cancel();
        }

        Session::new(id, rx, closed).tracked_by(tracked)
    }

    /// Remove a session and stop its relay. Unknown ids are ignored.
    pub async fn unregister(&self, id: SessionId) {
        let _ = self.commands.send(HubCommand::Unregister(id)).await;
    }

    /// Spawn a relay draining `session` into `sink`
    ///
    /// The relay unregisters its session when it stops, and is waited on by
    /// [`HubHandle::shutdown`].
    pub fn spawn_relay<S>(&self, session: Session, sink: S) -> JoinHandle<RelayExit>
    where
        S: VisitSink + 'static,
    {
        let hub = self.clone();
        self.tracker.spawn(async move {
            let id = session.id();
            let exit = relay(session, sink).await;
            hub.unregister(id).await;
            exit
        })
    }

    /// Current session count and cache size, or `None` if the hub stopped
    pub async fn stats(&self) -> Option<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(HubCommand::Stats(tx)).await.ok()?;
        rx.await.ok()
    }

    /// Close every session and wait for the hub, every relay, and every
    /// outstanding session to finish
    pub async fn shutdown(&self) {
        let _ = self.commands.send(HubCommand::Shutdown).await;
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Check whether the hub task has exited
    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }
}
