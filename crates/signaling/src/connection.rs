//! Client-Connection – Transport-Task einer einzelnen WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task haelt keinen Protokoll-Zustand: eingehende Frames
//! gehen als Ereignisse an den Koordinator, ausgehende Auftraege kommen ueber
//! die eigene mpsc-Queue zurueck.
//!
//! ```text
//! Browser --ws--> ClientConnection --Ereignis--> SessionCoordinator
//! Browser <--ws-- ClientConnection <--Ausgehend-- ClientSender
//! ```

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rendezvous_core::ConnectionId;
use rendezvous_protocol::ServerNachricht;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::coordinator::TrennGrund;
use crate::error::SignalingError;
use crate::sender::Ausgehend;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: SignalingState,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: SignalingState, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Browser trennt, der Socket fehlschlaegt oder der
    /// Koordinator das Schliessen anordnet. Am Ende wird der Koordinator
    /// immer ueber die Trennung informiert.
    pub async fn verarbeiten(self, socket: WebSocket) {
        let peer_addr = self.peer_addr;
        let koordinator = self.state.koordinator.clone();
        let (mut ws_tx, mut ws_rx) = socket.split();

        let (sende_tx, mut sende_rx) =
            mpsc::channel::<Ausgehend>(self.state.config.send_queue_groesse.max(1));

        let id = match koordinator.verbinden(sende_tx).await {
            Ok(id) => id,
            Err(fehler) => {
                tracing::warn!(peer = %peer_addr, %fehler, "Verbindung abgelehnt");
                if matches!(fehler, SignalingError::ServerVoll) {
                    let antwort = ServerNachricht::fehler("Server is full, try again later.");
                    if let Ok(json) = antwort.to_json() {
                        let _ = ws_tx.send(Message::Text(json)).await;
                    }
                }
                let _ = ws_tx.send(Message::Close(None)).await;
                return;
            }
        };

        tracing::info!(peer = %peer_addr, connection = %id, "WebSocket verbunden");

        let grund = loop {
            tokio::select! {
                // Eingehender Frame vom Browser
                frame = ws_rx.next() => {
                    let ergebnis = match frame {
                        Some(Ok(Message::Text(text))) => koordinator.nachricht(id, text).await,
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                            Ok(text) => koordinator.nachricht(id, text).await,
                            Err(_) => {
                                tracing::debug!(connection = %id, "Binaerframe ist kein UTF-8");
                                let antwort = ServerNachricht::fehler("Binary frames must contain UTF-8 JSON.");
                                if !senden(&mut ws_tx, id, &antwort).await {
                                    break TrennGrund::Transportfehler;
                                }
                                Ok(())
                            }
                        },
                        Some(Ok(Message::Pong(_))) => koordinator.pong(id).await,
                        // Ping beantwortet axum selbst
                        Some(Ok(Message::Ping(_))) => Ok(()),
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(connection = %id, "Verbindung vom Browser getrennt");
                            break TrennGrund::Geschlossen;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(connection = %id, fehler = %e, "WebSocket-Lesefehler");
                            break TrennGrund::Transportfehler;
                        }
                    };
                    if ergebnis.is_err() {
                        tracing::warn!(connection = %id, "Koordinator beendet – Verbindung wird geschlossen");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break TrennGrund::Shutdown;
                    }
                }

                // Auftrag vom Koordinator
                auftrag = sende_rx.recv() => {
                    match auftrag {
                        Some(Ausgehend::Nachricht(nachricht)) => {
                            if !senden(&mut ws_tx, id, &nachricht).await {
                                break TrennGrund::Transportfehler;
                            }
                        }
                        Some(Ausgehend::Ping) => {
                            if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                                tracing::warn!(connection = %id, fehler = %e, "Ping-Senden fehlgeschlagen");
                                break TrennGrund::Transportfehler;
                            }
                        }
                        Some(Ausgehend::Schliessen) | None => {
                            tracing::debug!(connection = %id, "Schliessen angeordnet");
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break TrennGrund::Geschlossen;
                        }
                    }
                }
            }
        };

        // Bei bereits entfernter Verbindung ist das ein No-op im Koordinator
        let _ = koordinator.getrennt(id, grund).await;
        tracing::info!(peer = %peer_addr, connection = %id, %grund, "Verbindungs-Task beendet");
    }
}

/// Serialisiert und sendet eine Server-Nachricht, `false` bei Transportfehler
async fn senden(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    id: ConnectionId,
    nachricht: &ServerNachricht,
) -> bool {
    let json = match nachricht.to_json() {
        Ok(json) => json,
        Err(e) => {
            // Nachricht ist verloren, der Socket aber noch intakt
            tracing::error!(connection = %id, fehler = %e, "Serialisierung fehlgeschlagen");
            return true;
        }
    };
    match ws_tx.send(Message::Text(json)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(connection = %id, fehler = %e, "Senden fehlgeschlagen");
            false
        }
    }
}
