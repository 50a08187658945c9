//! Websocket plumbing on a dedicated thread.
//!
//! The render loop must never block, so the socket lives on its own thread
//! with a small single-threaded runtime. Outbound messages go through an
//! unbounded channel; inbound events are polled non-blocking each frame.

use futures_util::{SinkExt, StreamExt};
use log::{error, warn};
use shared::{ClientMessage, ServerMessage};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc as tokio_mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
pub enum NetEvent {
    Server(ServerMessage),
    Closed,
}

pub struct Connection {
    incoming: std_mpsc::Receiver<NetEvent>,
    outgoing: tokio_mpsc::UnboundedSender<ClientMessage>,
}

impl Connection {
    /// Spawns the socket thread and starts connecting. Connection failures
    /// surface as a [`NetEvent::Closed`] from `poll`.
    pub fn open(url: String) -> Self {
        let (in_tx, in_rx) = std_mpsc::channel();
        let (out_tx, out_rx) = tokio_mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            match runtime {
                Ok(runtime) => runtime.block_on(run_socket(url, in_tx, out_rx)),
                Err(err) => {
                    error!("failed to start network runtime: {}", err);
                    let _ = in_tx.send(NetEvent::Closed);
                }
            }
        });

        Connection {
            incoming: in_rx,
            outgoing: out_tx,
        }
    }

    pub fn send(&self, message: ClientMessage) {
        let _ = self.outgoing.send(message);
    }

    /// Non-blocking; call in a loop each frame until it returns `None`.
    pub fn poll(&self) -> Option<NetEvent> {
        self.incoming.try_recv().ok()
    }
}

async fn run_socket(
    url: String,
    in_tx: std_mpsc::Sender<NetEvent>,
    mut out_rx: tokio_mpsc::UnboundedReceiver<ClientMessage>,
) {
    let stream = match connect_async(&url).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            error!("connection to {} failed: {}", url, err);
            let _ = in_tx.send(NetEvent::Closed);
            return;
        }
    };
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                let Some(message) = outgoing else {
                    break;
                };
                match serde_json::to_string(&message) {
                    Ok(text) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("could not serialize outbound message: {}", err),
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(event) => {
                                if in_tx.send(NetEvent::Server(event)).is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("unparseable server frame ({}): {}", err, text),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!("socket error: {}", err);
                        break;
                    }
                }
            }
        }
    }

    let _ = in_tx.send(NetEvent::Closed);
}
