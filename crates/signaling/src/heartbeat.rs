//! Heartbeat-Monitor – Periodische Liveness-Pruefung
//!
//! Pro Zyklus und Verbindung:
//! - hat sie die letzte Probe nicht beantwortet (`ist_aktiv == false`),
//!   wird sie als tot gemeldet
//! - sonst wird `ist_aktiv` zurueckgesetzt und eine neue Probe gesendet
//!
//! Ein toter Peer wird damit nach ein bis zwei Perioden erkannt. Das
//! Schliessen und der Teardown der gemeldeten Verbindungen laufen ueber den
//! Koordinator.

use rendezvous_core::ConnectionId;
use std::time::Duration;

use crate::registry::ConnectionRegistry;

/// Standard-Periode zwischen zwei Pruefungen
pub const STANDARD_PERIODE: Duration = Duration::from_secs(30);

/// Kleinste zulaessige Periode, `tokio::time::interval` verlangt > 0
pub const MINDEST_PERIODE: Duration = Duration::from_millis(1);

/// Liveness-Pruefung aller registrierten Verbindungen
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    periode: Duration,
}

impl HeartbeatMonitor {
    pub fn neu(periode: Duration) -> Self {
        Self {
            periode: periode.max(MINDEST_PERIODE),
        }
    }

    pub fn periode(&self) -> Duration {
        self.periode
    }

    /// Fuehrt einen Pruefzyklus aus und gibt die toten Verbindungen zurueck
    pub fn pruefen(&self, registry: &mut ConnectionRegistry) -> Vec<ConnectionId> {
        let mut tote = Vec::new();

        for conn in registry.iter_mut() {
            if !conn.ist_aktiv {
                tote.push(conn.id);
                continue;
            }
            conn.ist_aktiv = false;
            conn.ping();
        }

        if !tote.is_empty() {
            tracing::info!(anzahl = tote.len(), "Heartbeat: unbeantwortete Proben");
        }
        tote
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::neu(STANDARD_PERIODE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Ausgehend;
    use tokio::sync::mpsc;

    #[test]
    fn null_periode_wird_angehoben() {
        assert_eq!(HeartbeatMonitor::neu(Duration::ZERO).periode(), MINDEST_PERIODE);
        assert_eq!(
            HeartbeatMonitor::neu(Duration::from_secs(5)).periode(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn erster_zyklus_sendet_probe() {
        let mut reg = ConnectionRegistry::neu();
        let (tx, mut rx) = mpsc::channel(8);
        let id = reg.registrieren(tx);
        let monitor = HeartbeatMonitor::default();

        assert!(monitor.pruefen(&mut reg).is_empty());
        assert!(!reg.holen(&id).unwrap().ist_aktiv);
        assert_eq!(rx.try_recv().unwrap(), Ausgehend::Ping);
    }

    #[test]
    fn unbeantwortete_probe_meldet_tot() {
        let mut reg = ConnectionRegistry::neu();
        let (tx, _rx) = mpsc::channel(8);
        let id = reg.registrieren(tx);
        let monitor = HeartbeatMonitor::default();

        monitor.pruefen(&mut reg);
        assert_eq!(monitor.pruefen(&mut reg), vec![id]);
        // Der Monitor selbst entfernt nichts
        assert!(reg.enthaelt(&id));
    }

    #[test]
    fn beantwortete_probe_haelt_am_leben() {
        let mut reg = ConnectionRegistry::neu();
        let (tx, _rx) = mpsc::channel(8);
        let id = reg.registrieren(tx);
        let monitor = HeartbeatMonitor::neu(Duration::from_secs(5));

        for _ in 0..3 {
            assert!(monitor.pruefen(&mut reg).is_empty());
            reg.holen_mut(&id).unwrap().ist_aktiv = true;
        }
    }
}
