//! End-to-end tests against a scripted rosbridge server on loopback.

#![allow(unused_results)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rosbridge_client::{
    ConnectionState, ConnectionStateListener, Listener, ProtocolError, RosClient,
};
use rosbridge_settings::RosbridgeSettings;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

#[derive(Default)]
struct Events {
    log: Mutex<Vec<String>>,
}

impl ConnectionStateListener for Events {
    fn on_open(&self) {
        self.log.lock().push("open".into());
    }

    fn on_close(&self) {
        self.log.lock().push("close".into());
    }

    fn on_protocol_error(&self, error: &ProtocolError) {
        self.log.lock().push(format!("protocol:{error}"));
    }
}

/// Answers `subscribe` with one publish, `call_service` with the sum of
/// `a` and `b`, and `/rosapi/topics` with a fixed list. Forwards every frame
/// it receives to `seen`.
async fn spawn_server(seen: mpsc::UnboundedSender<Value>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(frame)) = ws.next().await {
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => {
                    let _ = ws.flush().await;
                    break;
                }
                _ => continue,
            };
            let request: Value = serde_json::from_str(text.as_str()).unwrap();
            let _ = seen.send(request.clone());

            let reply = match request["op"].as_str() {
                Some("subscribe") => Some(json!({
                    "op": "publish",
                    "topic": request["topic"],
                    "msg": {"data": "hello"},
                })),
                Some("call_service") if request["service"] == "/rosapi/topics" => Some(json!({
                    "op": "service_response",
                    "id": request["id"],
                    "values": {"topics": ["/chatter", "/rosout"]},
                })),
                Some("call_service") => {
                    let sum = request["args"]["a"].as_i64().unwrap_or(0)
                        + request["args"]["b"].as_i64().unwrap_or(0);
                    Some(json!({
                        "op": "service_response",
                        "id": request["id"],
                        "values": {"sum": sum},
                    }))
                }
                _ => None,
            };
            if let Some(reply) = reply {
                ws.send(Message::Text(reply.to_string().into())).await.unwrap();
            }
        }
    });

    format!("ws://{addr}")
}

async fn connect(url: String, events: Arc<Events>) -> RosClient {
    let mut settings = RosbridgeSettings::default();
    settings.connection.url = url;
    RosClient::connect(&settings, events).await.unwrap()
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting")
        .expect("channel closed")
}

#[tokio::test]
async fn subscribe_receives_publish() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let events = Arc::new(Events::default());
    let client = connect(url, events.clone()).await;
    assert_eq!(client.connection().state(), ConnectionState::Open);

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let topic = client.topic("/chatter", Some("std_msgs/String".into()));
    topic
        .subscribe(Listener::new(move |msg| {
            let _ = msg_tx.send(msg.clone());
        }))
        .unwrap();

    let request = recv(&mut seen_rx).await;
    assert_eq!(request["op"], "subscribe");
    assert_eq!(request["id"], "subscribe:/chatter:1");
    assert_eq!(recv(&mut msg_rx).await, json!({"data": "hello"}));
    assert_eq!(events.log.lock().first().map(String::as_str), Some("open"));
}

#[tokio::test]
async fn service_call_round_trip() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let client = connect(url, Arc::new(Events::default())).await;

    let mut args = Map::new();
    args.insert("a".into(), json!(2));
    args.insert("b".into(), json!(40));
    let values = client
        .service("/add_two_ints", None)
        .call(args, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(values, json!({"sum": 42}));
}

#[tokio::test]
async fn publish_is_preceded_by_advertise() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let client = connect(url, Arc::new(Events::default())).await;

    let mut topic = client.topic("/cmd", Some("std_msgs/Int32".into()));
    topic.publish(json!({"data": 7})).unwrap();

    assert_eq!(recv(&mut seen_rx).await["op"], "advertise");
    let publish = recv(&mut seen_rx).await;
    assert_eq!(publish["op"], "publish");
    assert_eq!(publish["msg"], json!({"data": 7}));
}

#[tokio::test]
async fn discovery_lists_topics() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let client = connect(url, Arc::new(Events::default())).await;

    let topics = client.list_topics(Duration::from_secs(5)).await.unwrap();
    assert_eq!(topics, vec!["/chatter", "/rosout"]);
}

#[tokio::test]
async fn disconnect_notifies_close_once() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let events = Arc::new(Events::default());
    let client = connect(url, events.clone()).await;

    tokio::time::timeout(Duration::from_secs(5), client.disconnect())
        .await
        .expect("disconnect did not finish");
    assert_eq!(client.connection().state(), ConnectionState::Closed);

    let closes = events.log.lock().iter().filter(|e| *e == "close").count();
    assert_eq!(closes, 1);
    assert!(client.topic("/t", None).subscribe(Listener::new(|_| {})).is_err());
}

#[test]
fn queued_frames_survive_disconnect_and_runtime_shutdown() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let url = spawn_server(seen_tx).await;
        let client = connect(url, Arc::new(Events::default())).await;
        client
            .topic("/cmd", Some("std_msgs/Int32".into()))
            .publish(json!({"data": 1}))
            .unwrap();
        client.param("/speed").set(json!(2)).unwrap();
        client.disconnect().await;
    });
    drop(runtime);

    let mut ops = Vec::new();
    while let Ok(frame) = seen_rx.try_recv() {
        ops.push(frame["op"].as_str().unwrap_or_default().to_owned());
    }
    assert_eq!(ops, vec!["advertise", "publish", "call_service"]);
}

#[tokio::test]
async fn disconnect_with_full_queue_still_closes() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(seen_tx).await;
    let mut settings = RosbridgeSettings::default();
    settings.connection.url = url;
    settings.connection.channel_capacity = 1;
    let events = Arc::new(Events::default());
    let client = RosClient::connect(&settings, events.clone()).await.unwrap();

    // nothing yields in between, so the second frame finds the queue full
    let mut topic = client.topic("/cmd", None);
    topic.advertise().unwrap();
    assert!(topic.publish(json!(1)).is_err());

    tokio::time::timeout(Duration::from_secs(5), client.disconnect())
        .await
        .expect("disconnect hung on a full queue");

    assert_eq!(recv(&mut seen_rx).await["op"], "advertise");
    assert_eq!(
        events.log.lock().iter().filter(|e| *e == "close").count(),
        1
    );
}
