use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{Client, WsActor};
use crate::actor::reconciler::ReconcilerHandle;
use crate::channel::{ChannelMessage, parse_inbound};
use crate::{debug, log};

impl WsActor {
    /// Handshake a new connection and register it
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Blocking during handshake, non-blocking after for polling reads
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                let _ = ws.get_ref().set_nonblocking(true);

                let hello = ChannelMessage::connected().to_json();
                if let Err(e) = ws.send(Message::Text(hello.into())) {
                    log!("ws"; "failed to send connected message: {}", e);
                    return;
                }

                let mut clients = self.clients.lock();
                clients.push(Client { ws });
                debug!("ws"; "client registered (total: {})", clients.len());
            }
            Err(e) => log!("ws"; "handshake failed: {}", e),
        }
    }

    /// Background thread reading client frames (non-blocking poll).
    ///
    /// Exits once the actor has dropped its side of `clients`.
    pub(super) fn client_reader_loop(clients: Arc<Mutex<Vec<Client>>>, reconciler: ReconcilerHandle) {
        while Arc::strong_count(&clients) > 1 {
            std::thread::sleep(Duration::from_millis(100));

            let mut guard = clients.lock();
            let mut disconnected = Vec::new();

            for (i, client) in guard.iter_mut().enumerate() {
                loop {
                    match client.ws.read() {
                        Ok(Message::Text(text)) => Self::handle_frame(client, &reconciler, &text),
                        Ok(Message::Close(_)) => {
                            disconnected.push(i);
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => break,
                        Err(_) => {
                            disconnected.push(i);
                            break;
                        }
                    }
                }
            }

            for i in disconnected.into_iter().rev() {
                guard.remove(i);
                debug!("ws"; "client disconnected (total: {})", guard.len());
            }
        }
    }

    fn handle_frame(client: &mut Client, reconciler: &ReconcilerHandle, text: &str) {
        match parse_inbound(text) {
            Ok(notification) => reconciler.notify(notification),
            Err(e) => {
                let reply = ChannelMessage::Rejected {
                    reason: e.to_string(),
                };
                let _ = client.ws.send(Message::Text(reply.to_json().into()));
            }
        }
    }
}
