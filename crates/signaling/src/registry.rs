//! Connection-Registry – Alle lebenden Verbindungen und ihr Zustand
//!
//! Arena-artige Map von `ConnectionId` auf `Connection`. Die Registry
//! gehoert dem `SessionCoordinator` und wird nur von ihm veraendert; sie ist
//! daher bewusst nicht thread-safe.

use chrono::{DateTime, Utc};
use rendezvous_core::ConnectionId;
use rendezvous_protocol::ServerNachricht;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::sender::{Ausgehend, ClientSender};

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Protokoll-Zustand einer Verbindung
///
/// Partner und Paarungszeitpunkt existieren nur im Zustand `Gepaart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, will (noch) keinen Partner
    Leerlauf,
    /// Steht in der Warteschlange
    Wartend,
    /// Hat einen Partner
    Gepaart {
        partner: ConnectionId,
        seit: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Zustand einer einzelnen Transport-Verbindung
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub zustand: VerbindungsZustand,
    /// Hat die letzte Liveness-Probe beantwortet
    pub ist_aktiv: bool,
    pub verbunden_seit: DateTime<Utc>,
    sender: ClientSender,
}

impl Connection {
    /// Aktueller Partner, falls gepaart
    pub fn partner(&self) -> Option<ConnectionId> {
        match self.zustand {
            VerbindungsZustand::Gepaart { partner, .. } => Some(partner),
            _ => None,
        }
    }

    /// Zeitpunkt der Paarung, falls gepaart
    pub fn gepaart_seit(&self) -> Option<DateTime<Utc>> {
        match self.zustand {
            VerbindungsZustand::Gepaart { seit, .. } => Some(seit),
            _ => None,
        }
    }

    pub fn ist_wartend(&self) -> bool {
        self.zustand == VerbindungsZustand::Wartend
    }

    /// Sendet eine JSON-Nachricht (fire-and-forget)
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        self.sender.senden(nachricht)
    }

    /// Sendet eine Liveness-Probe
    pub fn ping(&self) -> bool {
        self.sender.einreihen(Ausgehend::Ping)
    }

    /// Weist den Transport-Task an, den Socket zu schliessen
    pub fn schliessen(&self) -> bool {
        self.sender.einreihen(Ausgehend::Schliessen)
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Besitzt alle registrierten Verbindungen
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    verbindungen: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine neue Verbindung im Zustand `Leerlauf`
    ///
    /// Die vergebene ID kollidiert mit keiner aktuell registrierten.
    pub fn registrieren(&mut self, tx: mpsc::Sender<Ausgehend>) -> ConnectionId {
        let mut id = ConnectionId::new();
        while self.verbindungen.contains_key(&id) {
            id = ConnectionId::new();
        }

        self.verbindungen.insert(
            id,
            Connection {
                id,
                zustand: VerbindungsZustand::Leerlauf,
                ist_aktiv: true,
                verbunden_seit: Utc::now(),
                sender: ClientSender::neu(id, tx),
            },
        );

        tracing::debug!(connection = %id, "Verbindung registriert");
        id
    }

    pub fn holen(&self, id: &ConnectionId) -> Option<&Connection> {
        self.verbindungen.get(id)
    }

    pub fn holen_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.verbindungen.get_mut(id)
    }

    /// Entfernt eine Verbindung
    ///
    /// Idempotent: eine bereits entfernte ID ist ein No-op und liefert `None`.
    pub fn entfernen(&mut self, id: &ConnectionId) -> Option<Connection> {
        let entfernt = self.verbindungen.remove(id);
        if entfernt.is_some() {
            tracing::debug!(connection = %id, "Verbindung aus Registry entfernt");
        }
        entfernt
    }

    pub fn enthaelt(&self, id: &ConnectionId) -> bool {
        self.verbindungen.contains_key(id)
    }

    pub fn anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    /// Alle registrierten IDs (Reihenfolge unbestimmt)
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.verbindungen.keys().copied().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.verbindungen.values_mut()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
