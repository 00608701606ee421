//! End-to-end behaviour of the broadcast hub

use async_trait::async_trait;
use chrono::Utc;
use icra_core::{Error, Hub, HubConfig, RelayExit, Resource, Result, Session, Visit, VisitSink};
use std::sync::{Arc, Mutex};

fn visit(identity: &str) -> Visit {
    Visit::new(
        Utc::now(),
        identity,
        Resource::new("https", "example.com").with_path("/"),
    )
}

async fn next_identity(session: &mut Session) -> Option<String> {
    session.recv().await.map(|v| v.identity.clone())
}

async fn take(session: &mut Session, n: usize) -> Vec<String> {
    let mut received = Vec::with_capacity(n);
    for _ in 0..n {
        received.push(next_identity(session).await.expect("session closed early"));
    }
    received
}

/// Sink that records every identity written to it
#[derive(Clone, Default)]
struct SharedSink {
    written: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl SharedSink {
    fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl VisitSink for SharedSink {
    async fn send_visit(&mut self, visit: &Visit) -> Result<()> {
        if self.is_closed() {
            return Err(Error::transport("write after close"));
        }
        self.written.lock().unwrap().push(visit.identity.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[tokio::test]
async fn test_construction_guard() {
    for cache_size in 1..8 {
        let too_small = HubConfig::new(2 * cache_size - 1, cache_size);
        assert!(matches!(Hub::spawn(too_small), Err(Error::Config(_))));

        let hub = Hub::spawn(HubConfig::new(2 * cache_size, cache_size)).unwrap();
        hub.shutdown().await;
    }
}

#[tokio::test]
async fn test_replay_before_live() {
    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    for id in ["v1", "v2", "v3"] {
        hub.publish(visit(id)).await;
    }

    let mut session = hub.register().await;
    hub.publish(visit("v4")).await;
    hub.publish(visit("v5")).await;

    assert_eq!(take(&mut session, 4).await, vec!["v2", "v3", "v4", "v5"]);
    drop(session);
    hub.shutdown().await;
}

#[tokio::test]
async fn test_late_joiners_scenario() {
    let hub = Hub::spawn(HubConfig::new(4, 1)).unwrap();

    hub.publish(visit("v1")).await;
    let mut a = hub.register().await;
    assert_eq!(take(&mut a, 1).await, vec!["v1"]);

    hub.publish(visit("v2")).await;
    assert_eq!(take(&mut a, 1).await, vec!["v2"]);
    assert_eq!(hub.stats().await.unwrap().cached_visits, 1);

    let mut b = hub.register().await;
    assert_eq!(take(&mut b, 1).await, vec!["v2"]);

    hub.publish(visit("v3")).await;
    hub.publish(visit("v4")).await;
    assert_eq!(take(&mut a, 2).await, vec!["v3", "v4"]);
    assert_eq!(take(&mut b, 2).await, vec!["v3", "v4"]);

    drop((a, b));
    hub.shutdown().await;
}

#[tokio::test]
async fn test_unregister_is_idempotent() {
    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    let mut a = hub.register().await;
    let mut b = hub.register().await;

    hub.unregister(a.id()).await;
    hub.unregister(a.id()).await;
    hub.unregister(9999).await;

    assert_eq!(hub.stats().await.unwrap().sessions, 1);
    assert!(a.is_closed());
    assert_eq!(next_identity(&mut a).await, None);

    hub.publish(visit("after")).await;
    assert_eq!(take(&mut b, 1).await, vec!["after"]);

    drop((a, b));
    hub.shutdown().await;
}

#[tokio::test]
async fn test_slow_subscriber_is_disconnected() {
    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    let slow = hub.register().await;
    let mut fast = hub.register().await;

    // Fill the slow session's queue to capacity.
    for i in 0..4 {
        hub.publish(visit(&format!("v{i}"))).await;
    }
    assert_eq!(take(&mut fast, 4).await, vec!["v0", "v1", "v2", "v3"]);
    assert!(!slow.is_closed());

    hub.publish(visit("overflow")).await;
    assert_eq!(take(&mut fast, 1).await, vec!["overflow"]);
    assert!(slow.is_closed());
    assert_eq!(hub.stats().await.unwrap().sessions, 1);

    hub.publish(visit("later")).await;
    assert_eq!(take(&mut fast, 1).await, vec!["later"]);

    drop((slow, fast));
    hub.shutdown().await;
}

#[tokio::test]
async fn test_relay_unregisters_on_transport_failure() {
    struct FailingSink;

    #[async_trait]
    impl VisitSink for FailingSink {
        async fn send_visit(&mut self, _visit: &Visit) -> Result<()> {
            Err(Error::transport("broken pipe"))
        }
    }

    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    let session = hub.register().await;
    let relay = hub.spawn_relay(session, FailingSink);

    hub.publish(visit("v1")).await;
    assert_eq!(relay.await.unwrap(), RelayExit::TransportFailed);
    assert_eq!(hub.stats().await.unwrap().sessions, 0);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_graceful_shutdown_stops_all_relays() {
    let hub = Hub::spawn(HubConfig::new(8, 2)).unwrap();
    let sinks = [SharedSink::default(), SharedSink::default()];

    let mut relays = Vec::new();
    for sink in &sinks {
        let session = hub.register().await;
        relays.push(hub.spawn_relay(session, sink.clone()));
    }

    hub.publish(visit("v1")).await;
    hub.publish(visit("v2")).await;
    while sinks.iter().any(|s| s.written().len() < 2) {
        tokio::task::yield_now().await;
    }

    hub.shutdown().await;

    assert!(hub.is_stopped());
    for relay in &relays {
        assert!(relay.is_finished());
    }
    for sink in &sinks {
        assert!(sink.is_closed());
        assert_eq!(sink.written(), vec!["v1", "v2"]);
    }

    hub.publish(visit("v3")).await;
    for sink in &sinks {
        assert_eq!(sink.written(), vec!["v1", "v2"]);
    }

    let late = hub.register().await;
    assert!(late.is_closed());
}

#[tokio::test]
async fn test_dropped_session_is_removed_on_publish() {
    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    let gone = hub.register().await;
    let mut kept = hub.register().await;
    drop(gone);

    hub.publish(visit("v1")).await;
    assert_eq!(take(&mut kept, 1).await, vec!["v1"]);
    assert_eq!(hub.stats().await.unwrap().sessions, 1);

    drop(kept);
    hub.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_session_without_relay() {
    let hub = Hub::spawn(HubConfig::new(4, 2)).unwrap();
    let session = hub.register().await;
    let sink = SharedSink::default();

    let shutdown = tokio::spawn({
        let hub = hub.clone();
        let sink = sink.clone();
        async move {
            hub.shutdown().await;
            sink.is_closed()
        }
    });

    while !session.is_closed() {
        tokio::task::yield_now().await;
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!shutdown.is_finished());

    let relay = hub.spawn_relay(session, sink.clone());

    // The transport was released before shutdown returned.
    assert!(shutdown.await.unwrap());
    assert_eq!(relay.await.unwrap(), RelayExit::Closed);
    assert!(sink.written().is_empty());
}
