use super::*;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::accept_async;

use crate::event::{EVENT_CHAT_MESSAGE, EVENT_CHAT_RESPONSE};

/// Accept one WebSocket connection on an ephemeral port and hand it to
/// `handler`. Returns the `http` base URL for [`ChatClient::connect`].
async fn spawn_chat_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = accept_async(stream).await else {
            return;
        };
        handler(ws).await;
    });

    format!("http://{addr}")
}

async fn recv_event(chat: &mut ChatClient) -> Option<Envelope> {
    timeout(Duration::from_secs(1), chat.next_event())
        .await
        .expect("inbound event timed out")
}

// =============================================================
// URL mapping
// =============================================================

#[test]
fn ws_url_maps_http_scheme_and_appends_chat_path() {
    assert_eq!(
        ws_url("http://127.0.0.1:5000").expect("url"),
        "ws://127.0.0.1:5000/_chat"
    );
    assert_eq!(
        ws_url("https://chat.example.com/").expect("url"),
        "wss://chat.example.com/_chat"
    );
}

#[test]
fn ws_url_rejects_unknown_scheme() {
    let err = ws_url("ftp://example.com").expect_err("scheme should fail");
    assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
}

// =============================================================
// Connect / inbound delivery
// =============================================================

#[tokio::test]
async fn connect_to_unreachable_endpoint_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = ChatClient::connect(&format!("http://{addr}"))
        .await
        .expect_err("connect should fail");
    assert!(matches!(err, ClientError::Connect(_)));
}

#[tokio::test]
async fn inbound_chat_responses_arrive_in_order() {
    let base_url = spawn_chat_server(|mut ws| async move {
        for text in ["first", "second", "third"] {
            let json = encode_event(&Envelope::chat_response(text));
            ws.send(Message::Text(json.into())).await.expect("server send");
        }
    })
    .await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");

    for expected in ["first", "second", "third"] {
        let event = recv_event(&mut chat).await.expect("inbound queue ended early");
        assert_eq!(event.event, EVENT_CHAT_RESPONSE);
        assert_eq!(event.message(), Some(expected));
    }
}

#[tokio::test]
async fn undecodable_text_is_dropped_without_ending_the_stream() {
    let base_url = spawn_chat_server(|mut ws| async move {
        ws.send(Message::Text("not json".into()))
            .await
            .expect("server send");
        let json = encode_event(&Envelope::chat_response("after"));
        ws.send(Message::Text(json.into())).await.expect("server send");
    })
    .await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");

    let event = recv_event(&mut chat).await.expect("inbound queue ended early");
    assert_eq!(event.message(), Some("after"));
}

#[tokio::test]
async fn server_close_ends_the_inbound_queue() {
    let base_url = spawn_chat_server(|mut ws| async move {
        let _ = ws.close(None).await;
    })
    .await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");

    assert_eq!(recv_event(&mut chat).await, None);
    assert!(!chat.is_connected());
}

// =============================================================
// Outbound emit
// =============================================================

#[tokio::test]
async fn emit_delivers_raw_chat_message_payload() {
    let (seen_tx, seen_rx) = oneshot::channel::<Envelope>();
    let base_url = spawn_chat_server(move |mut ws| async move {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let event = decode_event(&text).expect("decode client event");
                let _ = seen_tx.send(event);
                break;
            }
        }
    })
    .await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");
    chat.emit(&Envelope::chat_message("  raw draft  "))
        .expect("emit");

    let seen = timeout(Duration::from_secs(1), seen_rx)
        .await
        .expect("server receive timed out")
        .expect("server task dropped");
    assert_eq!(seen.event, EVENT_CHAT_MESSAGE);
    assert_eq!(
        seen.data,
        serde_json::Value::String("  raw draft  ".to_owned())
    );
    chat.close();
}

// =============================================================
// Disposal
// =============================================================

#[tokio::test]
async fn no_event_is_delivered_after_close() {
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let base_url = spawn_chat_server(move |mut ws| async move {
        // Hold the event back until the client has disposed the connection.
        let _ = release_rx.await;
        let json = encode_event(&Envelope::chat_response("late"));
        let _ = ws.send(Message::Text(json.into())).await;
    })
    .await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");
    chat.close();
    assert!(!chat.is_connected());
    let _ = release_tx.send(());

    let event = timeout(Duration::from_millis(200), chat.next_event())
        .await
        .expect("next_event should return immediately after close");
    assert_eq!(event, None);
}

#[tokio::test]
async fn emit_after_close_reports_closed() {
    let base_url = spawn_chat_server(|_ws| async move {}).await;

    let mut chat = ChatClient::connect(&base_url).await.expect("connect");
    chat.close();

    let err = chat
        .emit(&Envelope::chat_message("hello"))
        .expect_err("emit should fail");
    assert!(matches!(err, ClientError::Closed));
}
