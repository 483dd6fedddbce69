//! WebSocket transport over `tokio-tungstenite`.
//!
//! One task owns the socket. Outbound frames reach it through a bounded
//! channel; inbound frames are fed straight into the [`Connection`] as
//! [`TransportEvent`]s, so listeners run on that task.
//!
//! Closing is signalled separately from the frame channel, so a full queue
//! cannot refuse it. On close the task writes every frame still queued,
//! sends the close frame and waits briefly for the server's reply.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rosbridge_settings::ConnectionSettings;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionStateListener};
use crate::error::{ClientError, TransportError};
use crate::transport::{Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the server to answer our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Sending half of a WebSocket connection.
#[derive(Clone, Debug)]
pub struct WebSocketTransport {
    tx: mpsc::Sender<Message>,
    shutdown: Arc<Notify>,
}

impl WebSocketTransport {
    fn new(tx: mpsc::Sender<Message>, shutdown: Arc<Notify>) -> Self {
        Self { tx, shutdown }
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        self.tx
            .try_send(Message::Text(text.into()))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Backpressure,
                TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    fn close(&self) {
        // stores a permit if the socket task is not waiting yet
        self.shutdown.notify_one();
    }
}

/// Open a WebSocket to `settings.url` and return an open [`Connection`]
/// together with the socket task.
///
/// The task ends once the socket is closed by either side. Await it after
/// [`Connection::close`] to be sure every queued frame was written.
pub async fn connect(
    settings: &ConnectionSettings,
    listener: Arc<dyn ConnectionStateListener>,
) -> Result<(Connection, JoinHandle<()>), ClientError> {
    let url = settings.url.as_str();
    let timeout = Duration::from_millis(settings.connect_timeout_ms);

    let (ws, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| ClientError::timeout(timeout, format!("connect to {url}")))?
        .map_err(|e| TransportError::Connect {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    info!(url, "connected to rosbridge");

    let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));
    let shutdown = Arc::new(Notify::new());
    let transport = WebSocketTransport::new(tx, Arc::clone(&shutdown));
    let conn = Connection::new(Arc::new(transport), listener);
    conn.handle_event(TransportEvent::Open);
    let task = tokio::spawn(socket_loop(ws, rx, shutdown, conn.clone()));
    Ok((conn, task))
}

async fn socket_loop(
    ws: WsStream,
    mut out_rx: mpsc::Receiver<Message>,
    shutdown: Arc<Notify>,
    conn: Connection,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            () = shutdown.notified() => {
                close_socket(&mut ws_tx, &mut ws_rx, &mut out_rx).await;
                break;
            }
            outbound = out_rx.recv() => {
                let Some(message) = outbound else { break };
                if let Err(e) = ws_tx.send(message).await {
                    conn.handle_event(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    conn.handle_event(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "close frame received");
                    break;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read failed");
                    conn.handle_event(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            }
        }
    }

    conn.handle_event(TransportEvent::Close);
}

/// Flush queued frames, send the close frame and wait for the reply.
async fn close_socket(
    ws_tx: &mut SplitSink<WsStream, Message>,
    ws_rx: &mut SplitStream<WsStream>,
    out_rx: &mut mpsc::Receiver<Message>,
) {
    out_rx.close();
    let mut flushed = 0usize;
    while let Ok(message) = out_rx.try_recv() {
        if let Err(e) = ws_tx.send(message).await {
            debug!(error = %e, "socket gone while flushing queued frames");
            return;
        }
        flushed += 1;
    }
    if let Err(e) = ws_tx.send(Message::Close(None)).await {
        debug!(error = %e, flushed, "socket gone before close frame");
        return;
    }

    let reply = async {
        while let Some(Ok(frame)) = ws_rx.next().await {
            if frame.is_close() {
                break;
            }
        }
    };
    if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, reply).await.is_err() {
        debug!("server did not answer close frame");
    }
    debug!(flushed, "websocket closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn transport(capacity: usize) -> (WebSocketTransport, mpsc::Receiver<Message>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = Arc::new(Notify::new());
        (WebSocketTransport::new(tx, Arc::clone(&shutdown)), rx, shutdown)
    }

    #[test]
    fn full_channel_is_backpressure() {
        let (transport, _rx, _) = transport(1);
        transport.send("a".into()).unwrap();
        assert_matches!(transport.send("b".into()), Err(TransportError::Backpressure));
    }

    #[test]
    fn dropped_task_is_closed() {
        let (transport, rx, _) = transport(4);
        drop(rx);
        assert_matches!(transport.send("a".into()), Err(TransportError::Closed));
        transport.close();
    }

    #[tokio::test]
    async fn close_is_not_refused_by_full_queue() {
        let (transport, mut rx, shutdown) = transport(1);
        transport.send("{}".into()).unwrap();
        assert_matches!(transport.send("{}".into()), Err(TransportError::Backpressure));

        transport.close();

        tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
            .await
            .expect("close signal was lost");
        assert_matches!(rx.try_recv(), Ok(Message::Text(t)) if t.as_str() == "{}");
    }

    #[tokio::test]
    async fn unreachable_server_is_connect_error() {
        let settings = ConnectionSettings {
            url: "ws://127.0.0.1:1".into(),
            connect_timeout_ms: 2_000,
            ..ConnectionSettings::default()
        };
        let result = connect(&settings, Arc::new(crate::NoopStateListener)).await;
        assert_matches!(
            result,
            Err(ClientError::Transport(TransportError::Connect { .. }) | ClientError::Timeout { .. })
        );
    }
}
