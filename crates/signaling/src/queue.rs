//! Matching-Queue – FIFO der Verbindungen die einen Partner suchen
//!
//! Eine ID steht hoechstens einmal in der Queue. Wer am laengsten wartet,
//! wird zuerst gepaart.

use rendezvous_core::ConnectionId;
use std::collections::VecDeque;

/// Strikte FIFO-Warteschlange ohne Duplikate
#[derive(Debug, Default)]
pub struct MatchingQueue {
    eintraege: VecDeque<ConnectionId>,
}

impl MatchingQueue {
    /// Erstellt eine leere Queue
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt `id` hinten an
    ///
    /// Gibt `false` zurueck (und aendert nichts) wenn `id` bereits wartet.
    pub fn einreihen(&mut self, id: ConnectionId) -> bool {
        if self.enthaelt(&id) {
            return false;
        }
        self.eintraege.push_back(id);
        true
    }

    /// Entnimmt den Kopf der Queue
    pub fn naechster(&mut self) -> Option<ConnectionId> {
        self.eintraege.pop_front()
    }

    /// Entfernt `id` an beliebiger Position, No-op wenn nicht enthalten
    pub fn entfernen(&mut self, id: &ConnectionId) -> bool {
        match self.eintraege.iter().position(|e| e == id) {
            Some(pos) => {
                self.eintraege.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn enthaelt(&self, id: &ConnectionId) -> bool {
        self.eintraege.contains(id)
    }

    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Wartende IDs, aelteste zuerst
    pub fn ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.eintraege.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
