//! Identifikationstypen fuer Rendezvous
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen mit anderen
//! UUID-Werten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Transport-Verbindung
///
/// Wird beim Verbindungsaufbau vergeben und nie wiederverwendet. Auf dem
/// Draht erscheint sie als nackter UUID-String (`partnerId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}
