//! Subscriber sessions and the relay that drains them to a transport
//!
//! A [`Session`] is the subscriber's end of a registration: a bounded queue
//! the hub fills with visits, and a close signal the hub fires when it drops
//! the subscriber. The relay task reads the queue and writes each visit to a
//! [`VisitSink`] until the sink fails or the session is closed.

use crate::{Result, Visit};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;

/// Identifier assigned to each registered session
pub type SessionId = u64;

/// The subscriber's end of a hub registration
///
/// A session holds the hub's shutdown open until it is dropped, so hub
/// shutdown also waits for sessions whose relay has not started yet.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    visits: mpsc::Receiver<Arc<Visit>>,
    closed: CancellationToken,
    _tracked: Option<TaskTrackerToken>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        visits: mpsc::Receiver<Arc<Visit>>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            id,
            visits,
            closed,
            _tracked: None,
        }
    }

    /// Hold `token` until the session is dropped
    pub(crate) fn tracked_by(mut self, token: TaskTrackerToken) -> Self {
        self._tracked = Some(token);
        self
    }

    /// Session identifier, used to unregister
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Receive the next visit
    ///
    /// Returns `None` once the session has been closed. Visits still queued
    /// at that point are discarded.
    pub async fn recv(&mut self) -> Option<Arc<Visit>> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            visit = self.visits.recv() => visit,
        }
    }

    /// Check whether the hub has closed this session
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Destination a relay writes visits to
#[async_trait]
pub trait VisitSink: Send {
    /// Write one visit to the transport
    async fn send_visit(&mut self, visit: &Visit) -> Result<()>;

    /// Release the transport
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Why a relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// The hub closed the session
    Closed,
    /// Writing to the transport failed
    TransportFailed,
}

/// Drain a session into a sink, in order, until either side stops
pub async fn relay<S: VisitSink>(mut session: Session, mut sink: S) -> RelayExit {
    let session_id = session.id();

    let exit = loop {
        let Some(visit) = session.recv().await else {
            break RelayExit::Closed;
        };

        if let Err(e) = sink.send_visit(&visit).await {
            tracing::debug!(session_id, error = %e, "Failed to write visit");
            break RelayExit::TransportFailed;
        }
    };

    if let Err(e) = sink.close().await {
        tracing::trace!(session_id, error = %e, "Failed to close transport");
    }
    drop(session);

    tracing::debug!(session_id, reason = ?exit, "Relay stopped");
    exit
}
