//! Request correlation and connection lifecycle against a mock target.

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use devtools_bridge::{ConnectOptions, ConnectionState, Error, RequestId};
use serde_json::json;

use common::{WAIT, attach};

#[tokio::test]
async fn test_timeout_then_late_response_is_discarded() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    // id 1: Network.enable resolves to {}
    let enable = tokio::spawn({
        let connection = connection.clone();
        async move { connection.enable("Network").await }
    });
    let request = peer.recv_request().await?;
    assert_eq!(request, json!({ "id": 1, "method": "Network.enable", "params": {} }));
    peer.respond(&request["id"], json!({})).await?;
    assert_eq!(enable.await??, json!({}));

    // id 2: no response within 50ms
    let err = connection
        .invoke_with_timeout(
            "Runtime",
            "evaluate",
            json!({ "expression": "1" }),
            Some(Duration::from_millis(50)),
        )
        .await
        .expect_err("should time out");
    match err {
        Error::RequestTimeout {
            request_id, method, ..
        } => {
            assert_eq!(request_id, RequestId::new(2));
            assert_eq!(method, "Runtime.evaluate");
        }
        other => panic!("expected RequestTimeout, got {other:?}"),
    }

    // The late response for id 2 must not reach anyone
    let request = peer.recv_request().await?;
    assert_eq!(request["id"], 2);
    peer.respond(&request["id"], json!({ "late": true })).await?;

    // id 3 proves the loop read past the late frame
    let follow_up = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("Page", "reload", json!({})).await }
    });
    let request = peer.recv_request().await?;
    assert_eq!(request["id"], 3);
    peer.respond(&request["id"], json!({ "ok": true })).await?;
    assert_eq!(follow_up.await??, json!({ "ok": true }));

    let stats = connection.stats();
    assert_eq!(stats.issued, 3);
    assert_eq!(stats.resolved, 2);
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.discarded_responses, 1);
    assert_eq!(connection.pending_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_close_rejects_pending_and_later_requests() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let mut tasks = Vec::new();
    for n in 0..3 {
        let connection = connection.clone();
        tasks.push(tokio::spawn(async move {
            connection
                .invoke_with_timeout("Runtime", "evaluate", json!({ "n": n }), None)
                .await
        }));
    }
    for _ in 0..3 {
        peer.recv_request().await?;
    }
    assert_eq!(connection.pending_count(), 3);

    connection.close().await;

    for task in tasks {
        let err = task.await?.expect_err("should be rejected");
        assert!(err.is_closed(), "unexpected error: {err:?}");
    }
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert_eq!(connection.stats().closed, 3);

    let err = connection.enable("Network").await.expect_err("closed");
    assert!(matches!(err, Error::ConnectionClosed));

    let err = connection
        .on("Network", "requestWillBeSent", |_| {})
        .expect_err("closed");
    assert!(matches!(err, Error::ConnectionClosed));

    // Idempotent
    connection.close().await;
    peer.wait_closed().await?;
    Ok(())
}

#[tokio::test]
async fn test_remote_close_drains_pending() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let pending = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("Page", "navigate", json!({ "url": "about:blank" })).await }
    });
    peer.recv_request().await?;
    peer.close().await?;

    let err = pending.await?.expect_err("should be rejected");
    assert!(matches!(err, Error::ConnectionClosed));

    tokio::time::timeout(WAIT, connection.closed()).await?;
    assert!(connection.is_closed());
    Ok(())
}

#[tokio::test]
async fn test_malformed_frames_are_discarded() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    peer.send_text("[1, 2, 3]").await?;
    peer.send_text(r#"{"params":{}}"#).await?;
    peer.send_text(r#"{"id":"abc","result":{}}"#).await?;
    peer.send_json(json!({ "id": 99, "result": {} })).await?;

    let call = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("Browser", "getVersion", json!({})).await }
    });
    let request = peer.recv_request().await?;
    peer.respond(&request["id"], json!({ "product": "Mock/1.0" })).await?;

    let result = call.await??;
    assert_eq!(result["product"], "Mock/1.0");
    assert_eq!(connection.state(), ConnectionState::Open);
    assert_eq!(connection.stats().discarded_responses, 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_closes_connection() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let pending = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("Page", "enable", json!({})).await }
    });
    peer.recv_request().await?;
    peer.send_text("this is not json").await?;

    let err = pending.await?.expect_err("should be rejected");
    assert!(err.is_closed());

    tokio::time::timeout(WAIT, connection.closed()).await?;
    assert_eq!(connection.state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_get_unique_ids() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;
    const COUNT: u64 = 20;

    let mut tasks = Vec::new();
    for n in 0..COUNT {
        let connection = connection.clone();
        tasks.push(tokio::spawn(async move {
            let result = connection
                .invoke("Runtime", "evaluate", json!({ "n": n }))
                .await?;
            Ok::<_, Error>((n, result))
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..COUNT {
        requests.push(peer.recv_request().await?);
    }
    let ids: BTreeSet<u64> = requests
        .iter()
        .filter_map(|r| r["id"].as_u64())
        .collect();
    assert_eq!(ids, (1..=COUNT).collect::<BTreeSet<_>>());

    // Answer in reverse order; routing is by id alone
    for request in requests.iter().rev() {
        peer.respond(&request["id"], json!({ "n": request["params"]["n"] }))
            .await?;
    }

    for task in tasks {
        let (n, result) = task.await??;
        assert_eq!(result["n"], n);
    }
    Ok(())
}

#[tokio::test]
async fn test_protocol_error_reaches_caller_only() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let call = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("Foo", "bar", json!({})).await }
    });
    let request = peer.recv_request().await?;
    peer.send_json(json!({
        "id": request["id"],
        "error": { "code": -32601, "message": "'Foo.bar' wasn't found" }
    }))
    .await?;

    let err = call.await?.expect_err("should be rejected");
    assert!(err.is_protocol_error());
    assert_eq!(err.protocol_code(), Some(-32601));
    assert!(err.to_string().contains("Foo.bar"));
    assert_eq!(connection.state(), ConnectionState::Open);
    assert_eq!(connection.stats().failed, 1);
    Ok(())
}

#[tokio::test]
async fn test_domain_handle_frames() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    // Rejected before an id is allocated
    let err = connection.invoke("", "enable", json!({})).await.expect_err("empty");
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert!(connection.domain("").is_err());

    let page = connection.domain("Page")?;
    assert_eq!(page.name(), "Page");

    let enable = tokio::spawn({
        let page = page.clone();
        async move { page.enable().await }
    });
    let request = peer.recv_request().await?;
    assert_eq!(request, json!({ "id": 1, "method": "Page.enable", "params": {} }));
    peer.respond(&request["id"], json!({})).await?;
    enable.await??;

    let navigate = tokio::spawn({
        let page = page.clone();
        async move {
            page.invoke_as::<serde_json::Map<String, serde_json::Value>, _>(
                "navigate",
                json!({ "url": "https://example.com" }),
            )
            .await
        }
    });
    let request = peer.recv_request().await?;
    assert_eq!(request["method"], "Page.navigate");
    assert_eq!(request["params"]["url"], "https://example.com");
    peer.respond(&request["id"], json!({ "frameId": "F1" })).await?;
    let result = navigate.await??;
    assert_eq!(result["frameId"], "F1");

    let disable = tokio::spawn(async move { page.disable().await });
    let request = peer.recv_request().await?;
    assert_eq!(request["method"], "Page.disable");
    assert_eq!(request["id"], 3);
    peer.respond(&request["id"], json!({})).await?;
    disable.await??;
    Ok(())
}

#[tokio::test]
async fn test_dropping_last_handle_closes_socket() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;
    let clone = connection.clone();
    drop(connection);
    drop(clone);

    peer.wait_closed().await?;
    Ok(())
}

#[tokio::test]
async fn test_dropped_call_leaves_nothing_pending() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let outer = tokio::time::timeout(
        Duration::from_millis(10),
        connection.invoke_with_timeout(
            "Runtime",
            "evaluate",
            json!({ "expression": "1" }),
            Some(Duration::from_millis(100)),
        ),
    )
    .await;
    assert!(outer.is_err());

    let request = peer.recv_request().await?;
    assert_eq!(connection.pending_count(), 0);
    assert_eq!(connection.stats().abandoned, 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(connection.stats().timed_out, 0);

    // The answer to the abandoned call goes nowhere
    peer.respond(&request["id"], json!({})).await?;
    let follow_up = tokio::spawn({
        let connection = connection.clone();
        async move { connection.enable("Page").await }
    });
    let request = peer.recv_request().await?;
    assert_eq!(request["id"], 2);
    peer.respond(&request["id"], json!({})).await?;
    follow_up.await??;

    assert_eq!(connection.stats().discarded_responses, 1);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_response_fails_its_caller() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;

    let mut calls = Vec::new();
    for _ in 0..2 {
        let connection = connection.clone();
        calls.push(tokio::spawn(async move {
            connection
                .invoke_with_timeout("Foo", "bar", json!({}), None)
                .await
        }));
    }
    let first = peer.recv_request().await?;
    let second = peer.recv_request().await?;

    // Error object without a message
    peer.send_json(json!({ "id": first["id"], "error": { "code": -32000 } }))
        .await?;
    // Error that is not an object at all
    peer.send_json(json!({ "id": second["id"], "error": "boom" }))
        .await?;

    let mut codes = Vec::new();
    for call in calls {
        let err = tokio::time::timeout(WAIT, call)
            .await??
            .expect_err("should be rejected");
        assert!(err.is_protocol_error(), "unexpected error: {err:?}");
        codes.push(err.protocol_code());
    }
    codes.sort_unstable();
    assert_eq!(codes, [Some(-32000), Some(0)]);

    assert_eq!(connection.pending_count(), 0);
    assert_eq!(connection.state(), ConnectionState::Open);
    Ok(())
}

#[tokio::test]
async fn test_weak_handle_in_listener_lets_socket_close() -> anyhow::Result<()> {
    let (connection, mut peer) = attach(ConnectOptions::default()).await?;
    let weak = connection.downgrade();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    {
        let weak = weak.clone();
        connection.on("Page", "loadEventFired", move |_| {
            let _ = tx.send(weak.upgrade().is_some());
        })?;
    }

    peer.emit("Page.loadEventFired", json!({})).await?;
    assert_eq!(tokio::time::timeout(WAIT, rx.recv()).await?, Some(true));

    drop(connection);
    assert!(weak.upgrade().is_none());
    peer.wait_closed().await?;
    Ok(())
}
