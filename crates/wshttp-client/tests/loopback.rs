//! ConnectionManager against a scripted in-process WebSocket peer.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use wshttp_client::{ConnectionManager, HealthOutcome, ManagerOptions, OnOpen};
use wshttp_core::{SocketRequest, SocketResponse};

type Peer = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/websocket/http", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> Peer {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Next text frame from the client, parsed as a request.
async fn read_request(peer: &mut Peer) -> SocketRequest {
    loop {
        match peer.next().await.expect("stream ended").expect("read failed") {
            Message::Text(t) => return serde_json::from_str(t.as_str()).unwrap(),
            Message::Binary(_) => panic!("expected a request on the text lane"),
            _ => continue,
        }
    }
}

/// Next binary frame from the client, parsed as a response.
async fn read_response(peer: &mut Peer) -> SocketResponse {
    loop {
        match peer.next().await.expect("stream ended").expect("read failed") {
            Message::Binary(b) => return serde_json::from_slice(&b).unwrap(),
            Message::Text(t) => panic!("expected a response on the binary lane, got text {}", t.as_str()),
            _ => continue,
        }
    }
}

/// Keep reading until the client goes away.
async fn drain(mut peer: Peer) {
    while let Some(Ok(_)) = peer.next().await {}
}

async fn wait_until<F: Fn() -> bool>(f: F) {
    for _ in 0..200 {
        if f() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

fn manager() -> ConnectionManager {
    ConnectionManager::new(ManagerOptions::default())
}

#[tokio::test]
async fn genuine_response_resolves_once_with_decoded_body() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let req = read_request(&mut peer).await;
        assert_eq!(req.handler, "Echo");
        assert_eq!(req.sign, "none");

        let resp = json!({
            "uid": req.uid, "header": {}, "code": 0, "msg": "success",
            "body": "hi%20there", "sign": "url"
        })
        .to_string();
        // the second copy has nobody waiting for it and must be dropped
        peer.send(Message::binary(resp.clone().into_bytes())).await.unwrap();
        peer.send(Message::binary(resp.into_bytes())).await.unwrap();
        drain(peer).await;
    });

    let mgr = manager();
    mgr.open(&url, None).await.unwrap();

    let req = SocketRequest::call("Echo", "Ping", "x");
    let uid = req.uid.clone();
    let resp = mgr.send_request_message(req, Duration::from_secs(2)).await;

    assert_eq!(resp.uid, uid);
    assert_eq!(resp.code, 0);
    assert_eq!(resp.msg, "success");
    assert_eq!(resp.body, "hi there");
    assert_eq!(mgr.pending_calls(), 0);

    mgr.close(1000, "done").await;
    server.await.unwrap();
}

#[tokio::test]
async fn silent_peer_times_out_with_failed_to_send() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let peer = accept(&listener).await;
        drain(peer).await;
    });

    let mgr = manager();
    mgr.open(&url, None).await.unwrap();

    let started = Instant::now();
    let resp = mgr
        .send_request_message(SocketRequest::call("Slow", "Never", ""), Duration::from_millis(150))
        .await;

    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(resp.code, -3);
    assert_eq!(resp.msg, "failed_to_send");
    assert_eq!(mgr.pending_calls(), 0);

    mgr.close(1000, "done").await;
    server.await.unwrap();
}

#[tokio::test]
async fn server_request_is_answered_on_binary_lane() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let req = json!({
            "uid": "req-42", "handler": "Echo", "method": "Ping",
            "header": {}, "body": "42", "sign": "none"
        });
        peer.send(Message::text(req.to_string())).await.unwrap();
        let resp = read_response(&mut peer).await;
        drain(peer).await;
        resp
    });

    let mgr = manager();
    mgr.register_fn("Echo", "Ping", |req, resp| {
        resp.body = req.body.clone();
    });
    mgr.open(&url, None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    mgr.close(1000, "done").await;

    let resp = server.await.unwrap();
    assert_eq!(resp.uid, "req-42");
    assert_eq!(resp.body, "42");
    assert_eq!(resp.code, 0);
}

#[tokio::test]
async fn unknown_handler_gets_no_response() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let unknown = json!({"uid": "u1", "handler": "Nope", "method": "X", "body": "", "sign": "none"});
        let known = json!({"uid": "u2", "handler": "Echo", "method": "Ping", "body": "b", "sign": "none"});
        peer.send(Message::text(unknown.to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        peer.send(Message::text(known.to_string())).await.unwrap();
        let first = read_response(&mut peer).await;
        drain(peer).await;
        first
    });

    let mgr = manager();
    mgr.register_fn("Echo", "Ping", |req, resp| resp.body = req.body.clone());
    mgr.open(&url, None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    mgr.close(1000, "done").await;

    let first = server.await.unwrap();
    assert_eq!(first.uid, "u2");
}

#[tokio::test]
async fn request_body_is_encoded_per_sign_and_response_per_handler_sign() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let req = read_request(&mut peer).await;
        let seen = req.body.clone();

        let call = json!({"uid": "s1", "handler": "Upper", "method": "Do", "body": "YWJj", "sign": "base64"});
        peer.send(Message::text(call.to_string())).await.unwrap();
        let answer = read_response(&mut peer).await;
        drain(peer).await;
        (seen, answer)
    });

    let mgr = manager();
    mgr.register_fn("Upper", "Do", |req, resp| {
        resp.body = req.body.to_uppercase();
        resp.sign = "base64".into();
    });
    mgr.open(&url, None).await.unwrap();

    let req = SocketRequest::call("Store", "Put", "hello").with_sign("base64");
    let _ = mgr.send_request_message(req, Duration::from_millis(300)).await;
    mgr.close(1000, "done").await;

    let (seen, answer) = server.await.unwrap();
    assert_eq!(seen, "aGVsbG8=");
    assert_eq!(answer.uid, "s1");
    assert_eq!(answer.sign, "base64");
    assert_eq!(answer.body, "QUJD");
}

#[tokio::test]
async fn peer_close_faults_and_sends_fail_fast() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        peer.close(None).await.unwrap();
        drain(peer).await;
    });

    let mgr = manager();
    mgr.open(&url, None).await.unwrap();
    assert!(!mgr.is_faulted());

    let m = mgr.clone();
    wait_until(move || m.is_faulted()).await;

    let resp = tokio::time::timeout(
        Duration::from_millis(50),
        mgr.send_request_message(SocketRequest::call("Echo", "Ping", "1"), Duration::from_secs(60)),
    )
    .await
    .expect("faulted send must not wait");
    assert!(resp.is_failed_to_send());

    server.await.unwrap();
}

#[tokio::test]
async fn health_check_reconnects_after_transport_failure() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        first.close(None).await.unwrap();
        drain(first).await;

        let mut second = accept(&listener).await;
        let req = read_request(&mut second).await;
        assert_eq!((req.handler.as_str(), req.method.as_str()), ("Health", "Index"));
        assert!(req.body.parse::<u128>().is_ok());
        let resp = json!({"uid": req.uid, "code": 0, "msg": "success", "body": "", "sign": "none", "header": {}});
        second.send(Message::binary(resp.to_string().into_bytes())).await.unwrap();
        drain(second).await;
    });

    let opened = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mgr = manager();
    let counter = std::sync::Arc::clone(&opened);
    let on_open: OnOpen = Box::new(move |_: &ConnectionManager| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });
    mgr.open(&url, Some(on_open)).await.unwrap();
    assert_eq!(opened.load(std::sync::atomic::Ordering::SeqCst), 1);

    let m = mgr.clone();
    wait_until(move || m.is_faulted()).await;

    assert_eq!(mgr.health_check().await, HealthOutcome::Reconnected);
    assert!(!mgr.is_faulted());
    assert_eq!(mgr.conn_url().await.as_deref(), Some(url.as_str()));

    assert_eq!(
        mgr.health_check().await,
        HealthOutcome::Healthy { code: 0, msg: "success".into() }
    );

    mgr.close(1000, "done").await;
    server.await.unwrap();
}

#[tokio::test]
async fn failed_open_keeps_url_for_retry() {
    let (listener, url) = bind().await;
    drop(listener);

    let mgr = manager();
    assert!(mgr.open(&url, None).await.is_err());
    assert!(mgr.is_faulted());
    assert_eq!(mgr.conn_url().await.as_deref(), Some(url.as_str()));

    assert_eq!(mgr.health_check().await, HealthOutcome::ReconnectFailed);
}

#[tokio::test]
async fn close_sends_close_frame_and_idles_monitor() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        loop {
            match peer.next().await {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| (u16::from(f.code), f.reason.as_str().to_string())),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    });

    let mgr = manager();
    mgr.open(&url, None).await.unwrap();
    mgr.close(4000, "bye").await;

    assert!(mgr.conn_url().await.is_none());
    assert!(!mgr.is_connected().await);
    assert_eq!(mgr.health_check().await, HealthOutcome::Idle);
    assert!(mgr.send_text_message("Echo", "Ping", "1").await.is_failed_to_send());

    let frame = server.await.unwrap();
    assert_eq!(frame, Some((4000, "bye".to_string())));
}

#[tokio::test]
async fn close_during_handshake_leaves_no_connection() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        if let Ok(peer) = tokio_tungstenite::accept_async(stream).await {
            drain(peer).await;
        }
    });

    let mgr = manager();
    let m = mgr.clone();
    let target = url.clone();
    let opening = tokio::spawn(async move { m.open(&target, None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    mgr.close(1000, "bye").await;

    assert!(opening.await.unwrap().is_err());
    assert!(!mgr.is_connected().await);
    assert!(mgr.is_faulted());
    assert!(mgr.conn_url().await.is_none());
    assert!(mgr.send_text_message("Echo", "Ping", "1").await.is_failed_to_send());

    server.await.unwrap();
}

fn fast_monitor() -> ConnectionManager {
    ConnectionManager::new(ManagerOptions {
        health_interval: Duration::from_millis(50),
        ..ManagerOptions::default()
    })
}

#[tokio::test]
async fn monitor_reconnects_on_its_own_after_peer_drops() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        first.close(None).await.unwrap();
        drain(first).await;

        // answer every health check until the client leaves
        let mut second = accept(&listener).await;
        while let Some(Ok(msg)) = second.next().await {
            if let Message::Text(t) = msg {
                let req: SocketRequest = serde_json::from_str(t.as_str()).unwrap();
                let resp = json!({
                    "uid": req.uid, "header": {}, "code": 0, "msg": "success",
                    "body": "", "sign": "none"
                });
                if second.send(Message::binary(resp.to_string().into_bytes())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mgr = fast_monitor();
    mgr.open(&url, None).await.unwrap();
    let m = mgr.clone();
    wait_until(move || m.is_faulted()).await;

    let monitor = mgr.spawn_health_monitor();
    let m = mgr.clone();
    wait_until(move || !m.is_faulted()).await;
    assert!(mgr.is_connected().await);
    assert!(mgr.send_text_message("Health", "Index", "1").await.is_success());

    monitor.abort();
    mgr.close(1000, "done").await;
    server.await.unwrap();
}

#[tokio::test]
async fn monitor_does_not_reconnect_after_close() {
    let (listener, url) = bind().await;
    let mgr = fast_monitor();
    let monitor = mgr.spawn_health_monitor();

    // ticks without a recorded url do nothing
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!mgr.is_connected().await);
    assert_eq!(mgr.pending_calls(), 0);

    let server = tokio::spawn(async move {
        let peer = accept(&listener).await;
        drain(peer).await;
        tokio::time::timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err()
    });

    mgr.open(&url, None).await.unwrap();
    mgr.close(1000, "done").await;

    assert!(server.await.unwrap(), "monitor reconnected after close");
    assert!(mgr.conn_url().await.is_none());
    monitor.abort();
}

#[tokio::test]
async fn zero_outbound_queue_still_carries_calls() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let req = read_request(&mut peer).await;
        let resp = json!({"uid": req.uid, "code": 0, "msg": "success", "body": "", "sign": "none"});
        peer.send(Message::binary(resp.to_string().into_bytes())).await.unwrap();
        drain(peer).await;
    });

    let mgr = ConnectionManager::new(ManagerOptions {
        outbound_queue: 0,
        ..ManagerOptions::default()
    });
    mgr.open(&url, None).await.unwrap();
    let resp = mgr
        .send_request_message(SocketRequest::call("Echo", "Ping", ""), Duration::from_secs(2))
        .await;
    assert!(resp.is_success());

    mgr.close(1000, "done").await;
    server.await.unwrap();
}
