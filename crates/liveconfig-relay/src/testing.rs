//! In-process mock relay for tests.
//!
//! Accepts `/receive/<account>/<device>` and `/forward/<account>/<device>`
//! WebSocket connections and copies every text frame received on a forward
//! connection to the receive connections with the same token pair. Frames
//! sent before any receiver is attached are held and flushed once one
//! connects.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

#[derive(Default)]
struct RelayState {
    receivers: HashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
    pending: HashMap<String, Vec<Message>>,
    paths: Vec<String>,
    forwarded: Vec<String>,
    pongs: Vec<Vec<u8>>,
}

/// Mock relay listening on an ephemeral localhost port.
pub struct MockRelay {
    addr: SocketAddr,
    state: Arc<Mutex<RelayState>>,
    accept_loop: JoinHandle<()>,
}

impl MockRelay {
    /// Bind and start accepting connections.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(RelayState::default()));

        let accept_state = state.clone();
        let accept_loop = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, accept_state.clone()));
            }
        });

        Ok(Self {
            addr,
            state,
            accept_loop,
        })
    }

    /// Base URL to configure channels with (`ws://127.0.0.1:<port>`).
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Request paths of every accepted connection, in accept order.
    pub fn paths(&self) -> Vec<String> {
        self.state.lock().paths.clone()
    }

    /// Every text frame received on forward connections, in order.
    pub fn forwarded(&self) -> Vec<String> {
        self.state.lock().forwarded.clone()
    }

    /// Number of receive connections currently attached.
    pub fn receiver_count(&self) -> usize {
        self.state.lock().receivers.values().map(Vec::len).sum()
    }

    /// Payloads of every pong received from receive connections.
    pub fn pongs(&self) -> Vec<Vec<u8>> {
        self.state.lock().pongs.clone()
    }

    /// Push a raw text frame to every receiver of `account/device`.
    pub fn inject(&self, account: &str, device: &str, frame: &str) {
        self.send_to(account, device, Message::Text(frame.to_string().into()));
    }

    /// Push a binary frame to every receiver of `account/device`.
    pub fn inject_binary(&self, account: &str, device: &str, payload: &[u8]) {
        self.send_to(account, device, Message::Binary(payload.to_vec().into()));
    }

    /// Ping every receiver of `account/device`.
    pub fn ping(&self, account: &str, device: &str, payload: &[u8]) {
        self.send_to(account, device, Message::Ping(payload.to_vec().into()));
    }

    fn send_to(&self, account: &str, device: &str, msg: Message) {
        let key = format!("{}/{}", account, device);
        let mut state = self.state.lock();
        deliver(&mut state, &key, msg);
    }

    /// Close every receive connection from the relay side.
    pub fn close_receivers(&self) {
        let mut state = self.state.lock();
        for (_, senders) in state.receivers.drain() {
            for sender in senders {
                let _ = sender.send(Message::Close(None));
            }
        }
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

fn deliver(state: &mut RelayState, key: &str, msg: Message) {
    let senders = state.receivers.entry(key.to_string()).or_default();
    senders.retain(|sender| !sender.is_closed());

    if senders.is_empty() {
        state.pending.entry(key.to_string()).or_default().push(msg);
        return;
    }

    for sender in senders.iter() {
        let _ = sender.send(msg.clone());
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<Mutex<RelayState>>) {
    let mut path = String::new();
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };

    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    state.lock().paths.push(path.clone());

    let parts: Vec<&str> = path.trim_start_matches('/').splitn(3, '/').collect();
    let [role, account, device] = parts.as_slice() else {
        return;
    };
    let key = format!("{}/{}", account, device);
    let (mut write, mut read) = ws.split();

    match *role {
        "receive" => {
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
            {
                let mut state = state.lock();
                let pending = state.pending.remove(&key).unwrap_or_default();
                for msg in pending {
                    let _ = tx.send(msg);
                }
                state.receivers.entry(key).or_default().push(tx);
            }

            let writer = tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    let is_close = matches!(msg, Message::Close(_));
                    if write.send(msg).await.is_err() || is_close {
                        break;
                    }
                }
            });

            while let Some(Ok(msg)) = read.next().await {
                match msg {
                    Message::Pong(data) => state.lock().pongs.push(data.to_vec()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            writer.abort();
        }
        "forward" => {
            while let Some(Ok(msg)) = read.next().await {
                match msg {
                    Message::Text(text) => {
                        let frame = text.to_string();
                        let mut state = state.lock();
                        state.forwarded.push(frame.clone());
                        deliver(&mut state, &key, Message::Text(frame.into()));
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
        _ => {}
    }
}
