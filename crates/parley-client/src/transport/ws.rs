//! STOMP transport over a WebSocket.
//!
//! Provides [`StompTransport`], the production [`Transport`]. The engine-facing
//! methods are synchronous: frames are queued on an unbounded channel and a
//! background task owns the socket, writing queued frames and turning inbound
//! MESSAGE frames into [`TransportEvent`]s. Protocol logic stays in the engine.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use parley_core::{
    AuthContext, Delivery, SubscriptionId, Topic, Transport, TransportError, TransportEvent,
};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};

use super::stomp::{Command, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for CONNECTED after sending CONNECT.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// STOMP 1.2 session over a WebSocket.
pub struct StompTransport {
    url: String,
    authorization: String,
    connected: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    next_handle: u64,
}

impl StompTransport {
    /// Create a disconnected transport for `url`.
    ///
    /// Returns the receiver on which connection events and deliveries arrive.
    pub fn new(
        url: impl Into<String>,
        auth: &AuthContext,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            url: url.into(),
            authorization: auth.bearer(),
            connected: Arc::new(AtomicBool::new(false)),
            outbound: None,
            events,
            next_handle: 0,
        };
        (transport, rx)
    }

    fn queue(&self, frame: &Frame) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        outbound
            .send(Message::Text(frame.encode().into()))
            .map_err(|_| TransportError::Closed("connection task stopped".into()))
    }

    async fn open(&self) -> Result<WsStream, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Io(format!("invalid url {}: {e}", self.url)))?;
        let value = HeaderValue::from_str(&self.authorization)
            .map_err(|e| TransportError::Rejected(format!("invalid token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);

        let host = request.uri().host().unwrap_or("localhost").to_owned();
        let (mut ws, _) =
            connect_async(request).await.map_err(|e| TransportError::Io(e.to_string()))?;

        let connect = Frame::connect(&host, &self.authorization);
        ws.send(Message::Text(connect.encode().into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, await_connected(&mut ws)).await {
            Ok(result) => result.map(|()| ws),
            Err(_) => Err(TransportError::Io("STOMP handshake timed out".into())),
        }
    }
}

impl Transport for StompTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.close();

        let ws = self.open().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        // Fresh flag per connection so a finishing task cannot clear a newer one.
        self.connected = Arc::new(AtomicBool::new(true));
        tokio::spawn(run_connection(ws, rx, self.events.clone(), Arc::clone(&self.connected)));

        tracing::info!(url = %self.url, "STOMP session established");
        let _ = self.events.send(TransportEvent::Connected);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&mut self, topic: Topic) -> Result<SubscriptionId, TransportError> {
        let id = self.next_handle;
        self.queue(&Frame::subscribe(id, &topic.to_string()))?;
        self.next_handle += 1;
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&mut self, handle: SubscriptionId) -> Result<(), TransportError> {
        self.queue(&Frame::unsubscribe(handle.0))
    }

    fn send(&mut self, destination: &str, body: String) -> Result<(), TransportError> {
        self.queue(&Frame::send(destination, body))
    }

    fn close(&mut self) {
        if self.is_connected() {
            let _ = self.queue(&Frame::disconnect());
        }
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the sender lets the connection task flush and exit.
        self.outbound = None;
    }
}

/// Read frames until CONNECTED or ERROR arrives.
async fn await_connected(ws: &mut WsStream) -> Result<(), TransportError> {
    while let Some(message) = ws.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                return Err(TransportError::Closed(reason));
            },
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Io(e.to_string())),
        };

        match Frame::decode(text.as_str()) {
            Ok(Some(frame)) if frame.command == Command::Connected => return Ok(()),
            Ok(Some(frame)) if frame.command == Command::Error => {
                let message = frame.get("message").unwrap_or("handshake refused").to_owned();
                return Err(TransportError::Rejected(message));
            },
            Ok(_) => {},
            Err(e) => return Err(TransportError::Io(format!("bad handshake frame: {e}"))),
        }
    }
    Err(TransportError::Closed("socket closed during handshake".into()))
}

/// Own the socket until either side closes it.
///
/// Reports [`TransportEvent::Disconnected`] unless the client closed the
/// session itself.
async fn run_connection(
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    let (mut write, mut read) = ws.split();

    let reason = loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        break format!("write failed: {e}");
                    }
                },
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    tracing::debug!("STOMP session closed by client");
                    return;
                },
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(reason) = dispatch(text.as_str(), &events) {
                        break reason;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map_or_else(|| "closed by server".to_owned(), |f| f.reason.to_string());
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_owned(),
            },
        }
    };

    connected.store(false, Ordering::SeqCst);
    tracing::warn!(%reason, "STOMP session ended");
    let _ = events.send(TransportEvent::Disconnected { reason });
}

/// Forward one inbound frame. Returns the reason if the session must end.
fn dispatch(text: &str, events: &mpsc::UnboundedSender<TransportEvent>) -> Result<(), String> {
    let frame = match Frame::decode(text) {
        Ok(Some(frame)) => frame,
        Ok(None) => return Ok(()),
        Err(e) => {
            tracing::debug!(error = %e, "dropping undecodable frame");
            return Ok(());
        },
    };

    match frame.command {
        Command::Message => {
            let Some(subscription) = frame.get("subscription").and_then(|s| s.parse().ok()) else {
                tracing::debug!("MESSAGE without numeric subscription header");
                return Ok(());
            };
            let delivery = Delivery { subscription: SubscriptionId(subscription), body: frame.body };
            let _ = events.send(TransportEvent::Delivery(delivery));
            Ok(())
        },
        Command::Error => Err(frame.get("message").unwrap_or("server error").to_owned()),
        Command::Receipt | Command::Connected => Ok(()),
        other => {
            tracing::debug!(?other, "unexpected frame from server");
            Ok(())
        },
    }
}
