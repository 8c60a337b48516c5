#![allow(clippy::unwrap_used)]
// Background poller behaviour against a mock agent.

mod common;

use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{monitor_with, status_doc};
use posmon_core::{CoreError, OverallLevel, Poller};

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn first_tick_publishes_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[("a", "Scanner", "RECOVERING", Some("COM3"))])),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| c.poll_interval = Duration::from_secs(60));
    let poller = monitor.start_poller();
    assert_eq!(poller.level(), OverallLevel::Red);

    let mut rx = poller.subscribe();
    let state = timeout(WAIT, rx.wait_for(|s| s.has_polled()))
        .await
        .unwrap()
        .unwrap()
        .clone();

    assert_eq!(state.level, OverallLevel::Yellow);
    assert_eq!(poller.level(), OverallLevel::Yellow);
    assert_eq!(poller.summary_lines(), vec!["Scanner — RECOVERING (COM=COM3)"]);
    assert!(poller.snapshot().is_some());

    poller.shutdown().await;
}

#[tokio::test]
async fn zero_period_still_polls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(status_doc(&[("a", "Scanner", "OK", None)])),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |_| {});
    let poller = Poller::new(monitor.client().clone(), Duration::ZERO).spawn();

    let mut rx = poller.subscribe();
    let state = timeout(WAIT, rx.wait_for(|s| s.tick >= 2))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert_eq!(state.level, OverallLevel::Green);

    poller.shutdown().await;
}

#[tokio::test]
async fn unreachable_agent_publishes_red_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[("a", "Scanner", "OK", None)]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| {
        c.timeout = Duration::from_millis(200);
        c.poll_interval = Duration::from_secs(60);
    });
    let poller = monitor.start_poller();

    let mut rx = poller.subscribe();
    let state = timeout(WAIT, rx.wait_for(|s| s.has_polled()))
        .await
        .unwrap()
        .unwrap()
        .clone();

    assert_eq!(state.level, OverallLevel::Red);
    assert!(state.snapshot.is_none());
    assert!(matches!(state.error.as_deref(), Some(CoreError::Timeout)));

    poller.shutdown().await;
}

#[tokio::test]
async fn slow_older_tick_does_not_overwrite_newer_result() {
    let server = MockServer::start().await;

    // Tick 1 gets a slow FAILED answer, every later tick a fast OK one.
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[("a", "Scanner", "FAILED", None)]))
                .set_delay(Duration::from_millis(1500)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(status_doc(&[("a", "Scanner", "OK", None)])),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| {
        c.timeout = Duration::from_secs(5);
        c.poll_interval = Duration::from_millis(200);
    });
    let poller = monitor.start_poller();

    let mut rx = poller.subscribe();
    timeout(WAIT, rx.wait_for(|s| s.tick >= 2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(poller.level(), OverallLevel::Green);

    // Let the slow tick 1 complete; it must be dropped.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let state = poller.state();
    assert_ne!(state.tick, 1);
    assert_eq!(state.level, OverallLevel::Green);

    poller.shutdown().await;
}

#[tokio::test]
async fn level_follows_agent_over_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[("a", "Printer", "FAILED", None)])),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(status_doc(&[("a", "Printer", "OK", None)])),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| c.poll_interval = Duration::from_millis(150));
    let poller = monitor.start_poller();

    let levels: Vec<OverallLevel> = timeout(
        WAIT,
        poller
            .stream()
            .filter(|s| std::future::ready(s.has_polled()))
            .map(|s| s.level)
            .take(2)
            .collect(),
    )
    .await
    .unwrap();

    assert_eq!(levels, vec![OverallLevel::Red, OverallLevel::Green]);
    poller.shutdown().await;
}

#[tokio::test]
async fn refresh_now_triggers_an_extra_tick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(status_doc(&[("a", "Scanner", "OK", None)])),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| c.poll_interval = Duration::from_secs(60));
    let poller = monitor.start_poller();
    let mut rx = poller.subscribe();

    timeout(WAIT, rx.wait_for(|s| s.tick >= 1)).await.unwrap().unwrap();
    poller.refresh_now();
    timeout(WAIT, rx.wait_for(|s| s.tick >= 2)).await.unwrap().unwrap();

    poller.shutdown().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn shutdown_lets_outstanding_tick_finish() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[("a", "Scanner", "OK", None)]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| c.poll_interval = Duration::from_secs(60));
    let poller = monitor.start_poller();
    let rx = poller.subscribe();

    // Give the first tick time to start its request.
    tokio::time::sleep(Duration::from_millis(100)).await;
    timeout(WAIT, poller.shutdown()).await.unwrap();

    let state = rx.borrow().clone();
    assert_eq!(state.tick, 1);
    assert_eq!(state.level, OverallLevel::Green);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn abort_cancels_in_flight_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_doc(&[]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let monitor = monitor_with(&server, |c| c.timeout = Duration::from_secs(60));
    let poller = monitor.start_poller();
    let rx = poller.subscribe();

    // Give the first tick time to start its request.
    tokio::time::sleep(Duration::from_millis(100)).await;
    timeout(Duration::from_secs(2), poller.abort())
        .await
        .unwrap();
    assert!(!rx.borrow().has_polled());
}
