//! WebSocket Actor - Authoring Client Connections
//!
//! This actor is responsible for:
//! - Managing WebSocket client connections
//! - Forwarding inbound notification frames to the reconciler
//! - Broadcasting reconciler outcomes to all connected clients
//!
//! # Architecture
//!
//! ```text
//! Clients --[notification]--> WsActor --notify--> ReconcilerActor
//!    ^                           |                      |
//!    +-------[outcome]-----------+<------Outcome--------+
//! ```

mod client_io;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::messages::WsMsg;
use super::reconciler::ReconcilerHandle;
use crate::channel::ChannelMessage;
use crate::debug;

/// A connected authoring client
struct Client {
    ws: WebSocket<TcpStream>,
}

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the reader thread)
    clients: Arc<Mutex<Vec<Client>>>,
    /// Where inbound notifications go
    reconciler: ReconcilerHandle,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>, reconciler: ReconcilerHandle) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            reconciler,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients = Arc::clone(&self.clients);
        let reconciler = self.reconciler.clone();
        std::thread::spawn(move || Self::client_reader_loop(clients, reconciler));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Outcome(outcome) => {
                    let frame = ChannelMessage::from(outcome).to_json();
                    self.broadcast(Message::Text(frame.into()));
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    debug!("ws"; "shutting down");
                    for mut client in self.clients.lock().drain(..) {
                        let _ = client.ws.close(None);
                    }
                    break;
                }
            }
        }
    }

    /// Send to every client, dropping the ones that fail
    fn broadcast(&self, msg: Message) {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain_mut(|client| client.ws.send(msg.clone()).is_ok());
        let dropped = before - clients.len();
        if dropped > 0 {
            debug!("ws"; "dropped {} client(s) on send", dropped);
        }
    }
}
