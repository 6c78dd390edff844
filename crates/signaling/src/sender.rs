//! Ausgehende Queue einer Verbindung
//!
//! Der Koordinator schreibt nie direkt auf einen Socket. Jede Verbindung
//! hat eine begrenzte mpsc-Queue, aus der ihr `ClientConnection`-Task liest.
//! Senden ist fire-and-forget: eine volle oder geschlossene Queue wird
//! geloggt und verworfen, der Zustand anderer Verbindungen bleibt unberuehrt.

use rendezvous_core::ConnectionId;
use rendezvous_protocol::ServerNachricht;
use tokio::sync::mpsc;

/// Auftrag an den Transport-Task einer Verbindung
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgehend {
    /// JSON-Nachricht an den Browser
    Nachricht(ServerNachricht),
    /// Liveness-Probe (WebSocket-Ping)
    Ping,
    /// Verbindung serverseitig schliessen
    Schliessen,
}

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<Ausgehend>,
}

impl ClientSender {
    /// Erstellt ein neues Handle
    pub fn neu(id: ConnectionId, tx: mpsc::Sender<Ausgehend>) -> Self {
        Self { id, tx }
    }

    /// Reiht einen Auftrag nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn einreihen(&self, auftrag: Ausgehend) -> bool {
        match self.tx.try_send(auftrag) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection = %self.id, "Send-Queue voll – Auftrag verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection = %self.id, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }

    /// Sendet eine JSON-Nachricht an den Browser
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        self.einreihen(Ausgehend::Nachricht(nachricht))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
