//! Log stream engine against the in-process daemon

mod common;

use std::convert::Infallible;
use std::time::Duration;

use common::{DaemonState, MockDaemon, DEVICE};
use hdc_client::{CancellationToken, Flow, HdcError};

async fn daemon_with_log() -> MockDaemon {
    MockDaemon::with_state(DaemonState {
        devices: vec![DEVICE.into()],
        log_lines: vec![
            "01-01 00:00:01.000 I A00001/Init: boot complete".into(),
            "01-01 00:00:02.000 W A00002/Net: link down".into(),
            "01-01 00:00:03.000 I A00001/Init: services up".into(),
        ],
        ..DaemonState::default()
    })
    .await
}

#[tokio::test]
async fn test_hilog_dump() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;

    let text = client.hilog(None).await.unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("link down"));
}

#[tokio::test]
async fn test_hilog_dump_with_filter() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;

    let text = client.hilog(Some("Init")).await.unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(!text.contains("Net"));
}

#[tokio::test]
async fn test_stream_stops_on_request() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;

    let mut received = Vec::new();
    client
        .hilog_stream(None, |chunk| {
            received.push(chunk.to_string());
            Ok::<_, Infallible>(Flow::from(received.len() < 5))
        })
        .await
        .unwrap();

    // no delivery after Stop
    assert_eq!(received.len(), 5);
    assert!(received[0].contains("boot complete"));
    assert!(received[4].starts_with("live record"));
}

#[tokio::test]
async fn test_stream_handler_error() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;

    let mut calls = 0;
    let result = client
        .hilog_stream(Some("Net"), |_| {
            calls += 1;
            Err::<Flow, _>("parser exploded")
        })
        .await;

    assert_eq!(calls, 1);
    match result {
        Err(HdcError::Handler(e)) => assert_eq!(e.to_string(), "parser exploded"),
        other => panic!("Expected Handler error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_until_cancelled() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        trigger.cancel();
    });

    let mut chunks = 0;
    client
        .hilog_stream_until(None, &cancel, |_| {
            chunks += 1;
            Ok::<_, Infallible>(Flow::Continue)
        })
        .await
        .unwrap();
    assert!(chunks >= 3);
}

#[tokio::test]
async fn test_stream_daemon_rejects() {
    let daemon = daemon_with_log().await;
    let client = daemon.bound_client().await;
    daemon.state().devices.clear();

    let result = client
        .hilog_stream(None, |_| Ok::<_, Infallible>(Flow::Continue))
        .await;
    assert!(matches!(result, Err(HdcError::Exec(_))));
}

#[tokio::test]
async fn test_stream_keeps_characters_split_across_chunks() {
    let daemon = MockDaemon::with_state(DaemonState {
        devices: vec![DEVICE.into()],
        // "café\n" with the two bytes of 'é' in separate frames
        raw_log: vec![b"caf\xC3".to_vec(), b"\xA9\n".to_vec()],
        ..DaemonState::default()
    })
    .await;
    let client = daemon.bound_client().await;

    let mut received = Vec::new();
    client
        .hilog_stream(None, |chunk| {
            received.push(chunk.to_string());
            Ok::<_, Infallible>(Flow::Continue)
        })
        .await
        .unwrap();

    assert_eq!(received.concat(), "caf\u{e9}\n");
    assert!(received.iter().all(|chunk| !chunk.contains('\u{FFFD}')));
}

#[tokio::test]
async fn test_stream_flushes_truncated_tail_at_end() {
    let daemon = MockDaemon::with_state(DaemonState {
        devices: vec![DEVICE.into()],
        raw_log: vec![b"tail \xE4\xB8".to_vec()],
        ..DaemonState::default()
    })
    .await;
    let client = daemon.bound_client().await;

    let mut received = Vec::new();
    client
        .hilog_stream(None, |chunk| {
            received.push(chunk.to_string());
            Ok::<_, Infallible>(Flow::Continue)
        })
        .await
        .unwrap();

    assert_eq!(received, vec!["tail ".to_string(), "\u{FFFD}".to_string()]);
}
