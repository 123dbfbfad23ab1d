//! Integration tests for the WebSocket transport and session client against
//! an in-process WebSocket server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

use diy_chat::{
    ConnectionState, InboundMessage, MessageContext, OutboundMessage, SessionClient, SessionState,
    Transport, WebSocketTransport,
};

const WAIT: Duration = Duration::from_secs(5);

enum ServerAction {
    Send(String),
    Close,
}

/// Server that serves one connection at a time and accepts again after each
/// close. Frames the client sends come out of `received`; actions pushed into
/// `actions` are applied to the current socket.
struct TestServer {
    url: String,
    received: mpsc::UnboundedReceiver<String>,
    actions: mpsc::UnboundedSender<ServerAction>,
    accepted: Arc<AtomicUsize>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (received_tx, received) = mpsc::unbounded_channel();
        let (actions, mut actions_rx) = mpsc::unbounded_channel();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                loop {
                    tokio::select! {
                        frame = ws.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                let _ = received_tx.send(text.as_str().to_owned());
                            }
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                            Some(Ok(_)) => {}
                        },
                        action = actions_rx.recv() => match action {
                            Some(ServerAction::Send(text)) => {
                                if ws.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(ServerAction::Close) => {
                                let _ = ws.close(None).await;
                                break;
                            }
                            None => return,
                        },
                    }
                }
            }
        });

        Self { url, received, actions, accepted }
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn send(&self, text: impl Into<String>) {
        self.actions.send(ServerAction::Send(text.into())).unwrap();
    }

    fn close(&self) {
        self.actions.send(ServerAction::Close).unwrap();
    }

    async fn next_frame(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("server stopped");
        serde_json::from_str(&text).unwrap()
    }
}

async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, state: ConnectionState) {
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for connection state")
        .unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Connecting reports open, and a second connect does not open another socket.
#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = TestServer::start().await;
    let transport = WebSocketTransport::new(&server.url);

    let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let _sub = {
        let states = Arc::clone(&states);
        transport.on_state_change(move |s| states.lock().push(*s))
    };

    transport.connect().await.unwrap();
    transport.connect().await.unwrap();

    assert_eq!(transport.state(), ConnectionState::Open);
    assert_eq!(
        *states.lock(),
        vec![ConnectionState::Connecting, ConnectionState::Open]
    );
    transport.disconnect().await;
}

/// A frame sent while open reaches the server exactly once, as JSON.
#[tokio::test]
async fn test_send_reaches_server() {
    let mut server = TestServer::start().await;
    let transport = WebSocketTransport::new(&server.url);
    transport.connect().await.unwrap();

    let message = OutboundMessage::new("Is this stud safe to drill?", MessageContext::step("p1", "step_2"));
    assert!(transport.send(&message));

    let frame = server.next_frame().await;
    assert_eq!(frame["content"], "Is this stud safe to drill?");
    assert_eq!(frame["context"], json!({"project_id": "p1", "step_id": "step_2"}));
    assert_eq!(frame["correlation_id"], json!(message.correlation_id));
    transport.disconnect().await;
}

/// Inbound frames reach handlers in order; malformed frames are dropped.
#[tokio::test]
async fn test_inbound_frames_routed_and_malformed_dropped() {
    let server = TestServer::start().await;
    let transport = WebSocketTransport::new(&server.url);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = transport.on_message(move |m| {
        let _ = tx.send(m.clone());
    });
    transport.connect().await.unwrap();

    server.send("this is not json");
    server.send(InboundMessage::ai_response("Use a stud finder first").to_json().unwrap());

    let received = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert!(received.is_ai_response());
    assert_eq!(received.content, "Use a stud finder first");

    let stats = transport.router().stats();
    assert_eq!(stats.frames_dropped, 1);
    assert_eq!(stats.frames_routed, 1);
    transport.disconnect().await;
}

/// A server-side close moves the transport to closed and later sends fail.
#[tokio::test]
async fn test_server_close_moves_to_closed() {
    let server = TestServer::start().await;
    let transport = WebSocketTransport::new(&server.url);
    let mut states = transport.watch_state();
    transport.connect().await.unwrap();

    server.close();
    wait_for_state(&mut states, ConnectionState::Closed).await;

    let message = OutboundMessage::new("anyone there?", MessageContext::default());
    assert!(!transport.send(&message));
}

/// An unreachable server leaves the transport closed with an error.
#[tokio::test]
async fn test_unreachable_server_reports_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let transport = WebSocketTransport::new(url);
    assert!(transport.connect().await.is_err());
    assert_eq!(transport.state(), ConnectionState::Closed);
}

/// A full exchange through the session client.
#[tokio::test]
async fn test_session_round_trip() {
    let mut server = TestServer::start().await;
    let transport = Arc::new(WebSocketTransport::new(&server.url));
    let session = SessionClient::new(
        Arc::clone(&transport),
        MessageContext::project("p1"),
        Some("Tell me about your door.".to_string()),
    );

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::ConnectedIdle);

    session.send("It squeaks when opening").unwrap();
    assert!(session.is_typing());

    let frame = server.next_frame().await;
    assert_eq!(frame["content"], "It squeaks when opening");
    assert_eq!(frame["context"]["project_id"], "p1");
    let correlation_id = frame["correlation_id"].as_str().unwrap().to_string();

    server.send(
        InboundMessage::ai_response("Try lubricating the hinge pins.")
            .with_correlation_id(correlation_id)
            .to_json()
            .unwrap(),
    );

    wait_until(|| session.state() == SessionState::ConnectedIdle).await;
    let contents: Vec<_> = session.transcript().into_iter().map(|e| e.content).collect();
    assert_eq!(
        contents,
        vec![
            "Tell me about your door.",
            "It squeaks when opening",
            "Try lubricating the hinge pins."
        ]
    );
}

/// Closing the session closes the socket and unregisters its handlers.
#[tokio::test]
async fn test_session_close_tears_down() {
    let server = TestServer::start().await;
    let transport = Arc::new(WebSocketTransport::new(&server.url));
    let mut session = SessionClient::new(Arc::clone(&transport), MessageContext::default(), None);
    session.connect().await.unwrap();

    session.close().await;

    assert_eq!(transport.state(), ConnectionState::Closed);
    assert_eq!(transport.router().message_handler_count(), 0);
    assert_eq!(session.state(), SessionState::Disconnected);
    drop(server);
}

/// After a server-side close the same transport connects again and sends on
/// the new socket.
#[tokio::test]
async fn test_reconnect_after_server_close() {
    let mut server = TestServer::start().await;
    let transport = WebSocketTransport::new(&server.url);
    let mut states = transport.watch_state();

    transport.connect().await.unwrap();
    server.close();
    wait_for_state(&mut states, ConnectionState::Closed).await;

    transport.connect().await.unwrap();
    assert_eq!(transport.state(), ConnectionState::Open);
    wait_until(|| server.accepted() == 2).await;

    let message = OutboundMessage::new("Back again", MessageContext::project("p1"));
    assert!(transport.send(&message));
    let frame = server.next_frame().await;
    assert_eq!(frame["content"], "Back again");
    transport.disconnect().await;
}

/// A session that lost its connection becomes usable again after reconnecting.
#[tokio::test]
async fn test_session_recovers_after_reconnect() {
    let mut server = TestServer::start().await;
    let transport = Arc::new(WebSocketTransport::new(&server.url));
    let mut states = transport.watch_state();
    let mut session = SessionClient::new(Arc::clone(&transport), MessageContext::project("p1"), None);

    session.connect().await.unwrap();
    session.send("First question").unwrap();
    assert_eq!(server.next_frame().await["content"], "First question");

    server.close();
    wait_for_state(&mut states, ConnectionState::Closed).await;
    wait_until(|| session.state() == SessionState::Disconnected).await;
    assert!(!session.is_typing());
    assert!(session.send("Lost in the void").is_err());

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::ConnectedIdle);

    session.send("Second question").unwrap();
    let frame = server.next_frame().await;
    assert_eq!(frame["content"], "Second question");
    server.send(InboundMessage::ai_response("Second answer").to_json().unwrap());
    wait_until(|| session.state() == SessionState::ConnectedIdle).await;

    let contents: Vec<_> = session.transcript().into_iter().map(|e| e.content).collect();
    assert_eq!(contents, vec!["First question", "Second question", "Second answer"]);
    session.close().await;
}

/// A state handler reacting to `open` can send straight away.
#[tokio::test]
async fn test_send_from_open_handler_is_delivered() {
    let mut server = TestServer::start().await;
    let transport = Arc::new(WebSocketTransport::new(&server.url));
    let sent = Arc::new(parking_lot::Mutex::new(None));

    let _sub = {
        let weak: Weak<WebSocketTransport> = Arc::downgrade(&transport);
        let sent = Arc::clone(&sent);
        transport.on_state_change(move |state| {
            if *state != ConnectionState::Open {
                return;
            }
            if let Some(transport) = weak.upgrade() {
                let hello = OutboundMessage::new("hello on open", MessageContext::default());
                *sent.lock() = Some(transport.send(&hello));
            }
        })
    };

    transport.connect().await.unwrap();

    assert_eq!(*sent.lock(), Some(true));
    assert_eq!(server.next_frame().await["content"], "hello on open");
    transport.disconnect().await;
}

/// A disconnect issued while the handshake is still pending wins: the
/// transport never reports open and stays closed.
#[tokio::test]
async fn test_disconnect_during_handshake_stays_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (release, released) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = released.await;
        if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let transport = Arc::new(WebSocketTransport::new(url));
    let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let _sub = {
        let states = Arc::clone(&states);
        transport.on_state_change(move |s| states.lock().push(*s))
    };
    let mut watch = transport.watch_state();

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.connect().await })
    };
    wait_for_state(&mut watch, ConnectionState::Connecting).await;

    transport.disconnect().await;
    assert_eq!(transport.state(), ConnectionState::Closed);

    release.send(()).unwrap();
    tokio::time::timeout(WAIT, pending).await.unwrap().unwrap().unwrap();

    assert_eq!(transport.state(), ConnectionState::Closed);
    assert_eq!(
        *states.lock(),
        vec![ConnectionState::Connecting, ConnectionState::Closed]
    );
    let message = OutboundMessage::new("too late", MessageContext::default());
    assert!(!transport.send(&message));
}
