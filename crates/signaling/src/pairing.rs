//! Pairing-Session – Bilden und Aufloesen der Partner-Verknuepfung
//!
//! Eine Paarung ist kein eigenes Objekt, sondern die gegenseitige
//! Referenz zweier Verbindungen. Beide Seiten werden immer im selben
//! Schritt veraendert; es gibt keinen beobachtbaren Zwischenzustand, in dem
//! nur eine Seite gepaart ist.

use chrono::{DateTime, Utc};
use rendezvous_core::ConnectionId;
use rendezvous_protocol::{Rolle, ServerNachricht};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{ConnectionRegistry, VerbindungsZustand};

/// Ergebnis einer aufgeloesten Paarung
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aufloesung {
    /// Der verbleibende Partner, falls er noch registriert und symmetrisch verknuepft war
    pub partner: Option<ConnectionId>,
    /// Lebensdauer der Paarung in Sekunden
    pub dauer_sek: f64,
}

/// Operationen auf der Partner-Verknuepfung
pub struct PairingSession;

impl PairingSession {
    /// Paart `anbieter` (Offerer) mit `antwortender` (Answerer)
    ///
    /// Prueft beide Seiten bevor irgendetwas veraendert wird. Bei Erfolg
    /// erhalten beide eine `match`-Nachricht mit ihrer Rolle.
    pub fn bilden(
        registry: &mut ConnectionRegistry,
        anbieter: ConnectionId,
        antwortender: ConnectionId,
        jetzt: DateTime<Utc>,
    ) -> SignalingResult<()> {
        if anbieter == antwortender {
            return Err(SignalingError::SelbstPaarung(anbieter));
        }
        for id in [anbieter, antwortender] {
            let conn = registry
                .holen(&id)
                .ok_or(SignalingError::UnbekannteVerbindung(id))?;
            if conn.partner().is_some() {
                return Err(SignalingError::BereitsGepaart(id));
            }
        }

        for (id, partner) in [(anbieter, antwortender), (antwortender, anbieter)] {
            if let Some(conn) = registry.holen_mut(&id) {
                conn.zustand = VerbindungsZustand::Gepaart {
                    partner,
                    seit: jetzt,
                };
            }
        }

        if let Some(conn) = registry.holen(&anbieter) {
            conn.senden(ServerNachricht::paarung(antwortender, Rolle::Offerer));
        }
        if let Some(conn) = registry.holen(&antwortender) {
            conn.senden(ServerNachricht::paarung(anbieter, Rolle::Answerer));
        }

        tracing::info!(offerer = %anbieter, answerer = %antwortender, "Paarung gebildet");
        Ok(())
    }

    /// Loest die Paarung von `id` auf, beide Seiten gehen in `Leerlauf`
    ///
    /// Gibt `None` zurueck wenn `id` nicht gepaart (oder nicht registriert)
    /// ist. Damit ist doppeltes Aufloesen ein No-op. Der Partner wird nur
    /// zurueckgesetzt wenn er noch auf `id` zeigt. Die Benachrichtigung des
    /// Partners ist Sache des Aufrufers.
    pub fn aufloesen(
        registry: &mut ConnectionRegistry,
        id: ConnectionId,
        jetzt: DateTime<Utc>,
    ) -> Option<Aufloesung> {
        let conn = registry.holen_mut(&id)?;
        let VerbindungsZustand::Gepaart { partner, seit } = conn.zustand else {
            return None;
        };
        conn.zustand = VerbindungsZustand::Leerlauf;

        let partner = match registry.holen_mut(&partner) {
            Some(p) if p.partner() == Some(id) => {
                p.zustand = VerbindungsZustand::Leerlauf;
                Some(partner)
            }
            _ => {
                tracing::debug!(connection = %id, partner = %partner, "Partner-Referenz war verwaist");
                None
            }
        };

        let dauer_sek = (jetzt - seit).num_milliseconds().max(0) as f64 / 1000.0;
        tracing::info!(connection = %id, dauer_sek, "Paarung aufgeloest");

        Some(Aufloesung { partner, dauer_sek })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Ausgehend;
    use chrono::Duration;
    use tokio::sync::mpsc;

    fn verbinden(reg: &mut ConnectionRegistry) -> (ConnectionId, mpsc::Receiver<Ausgehend>) {
        let (tx, rx) = mpsc::channel(8);
        (reg.registrieren(tx), rx)
    }

    #[test]
    fn bilden_ist_symmetrisch() {
        let mut reg = ConnectionRegistry::neu();
        let (a, mut rx_a) = verbinden(&mut reg);
        let (b, mut rx_b) = verbinden(&mut reg);
        let jetzt = Utc::now();

        PairingSession::bilden(&mut reg, a, b, jetzt).unwrap();

        assert_eq!(reg.holen(&a).unwrap().partner(), Some(b));
        assert_eq!(reg.holen(&b).unwrap().partner(), Some(a));
        assert_eq!(reg.holen(&a).unwrap().gepaart_seit(), Some(jetzt));
        assert_eq!(reg.holen(&b).unwrap().gepaart_seit(), Some(jetzt));

        assert_eq!(
            rx_a.try_recv().unwrap(),
            Ausgehend::Nachricht(ServerNachricht::paarung(b, Rolle::Offerer))
        );
        assert_eq!(
            rx_b.try_recv().unwrap(),
            Ausgehend::Nachricht(ServerNachricht::paarung(a, Rolle::Answerer))
        );
    }

    #[test]
    fn keine_selbst_paarung() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _rx) = verbinden(&mut reg);

        assert!(matches!(
            PairingSession::bilden(&mut reg, a, a, Utc::now()),
            Err(SignalingError::SelbstPaarung(_))
        ));
        assert!(reg.holen(&a).unwrap().partner().is_none());
    }

    #[test]
    fn bilden_mit_unbekannter_verbindung_aendert_nichts() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _rx) = verbinden(&mut reg);
        let fremd = ConnectionId::new();

        assert!(matches!(
            PairingSession::bilden(&mut reg, a, fremd, Utc::now()),
            Err(SignalingError::UnbekannteVerbindung(id)) if id == fremd
        ));
        assert_eq!(reg.holen(&a).unwrap().zustand, VerbindungsZustand::Leerlauf);
    }

    #[test]
    fn bilden_mit_bereits_gepaarter_verbindung() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _ra) = verbinden(&mut reg);
        let (b, _rb) = verbinden(&mut reg);
        let (c, _rc) = verbinden(&mut reg);
        PairingSession::bilden(&mut reg, a, b, Utc::now()).unwrap();

        assert!(matches!(
            PairingSession::bilden(&mut reg, c, b, Utc::now()),
            Err(SignalingError::BereitsGepaart(id)) if id == b
        ));
        assert!(reg.holen(&c).unwrap().partner().is_none());
        assert_eq!(reg.holen(&b).unwrap().partner(), Some(a));
    }

    #[test]
    fn aufloesen_setzt_beide_seiten_zurueck() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _ra) = verbinden(&mut reg);
        let (b, _rb) = verbinden(&mut reg);
        let start = Utc::now();
        PairingSession::bilden(&mut reg, a, b, start).unwrap();

        let aufloesung =
            PairingSession::aufloesen(&mut reg, a, start + Duration::seconds(12)).unwrap();

        assert_eq!(aufloesung.partner, Some(b));
        assert!((aufloesung.dauer_sek - 12.0).abs() < 1e-9);
        assert_eq!(reg.holen(&a).unwrap().zustand, VerbindungsZustand::Leerlauf);
        assert_eq!(reg.holen(&b).unwrap().zustand, VerbindungsZustand::Leerlauf);
    }

    #[test]
    fn doppeltes_aufloesen_ist_noop() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _ra) = verbinden(&mut reg);
        let (b, _rb) = verbinden(&mut reg);
        PairingSession::bilden(&mut reg, a, b, Utc::now()).unwrap();

        assert!(PairingSession::aufloesen(&mut reg, a, Utc::now()).is_some());
        assert!(PairingSession::aufloesen(&mut reg, a, Utc::now()).is_none());
        assert!(PairingSession::aufloesen(&mut reg, b, Utc::now()).is_none());
    }

    #[test]
    fn verwaister_partner_wird_uebersprungen() {
        let mut reg = ConnectionRegistry::neu();
        let (a, _ra) = verbinden(&mut reg);
        let (b, _rb) = verbinden(&mut reg);
        PairingSession::bilden(&mut reg, a, b, Utc::now()).unwrap();
        reg.entfernen(&b);

        let aufloesung = PairingSession::aufloesen(&mut reg, a, Utc::now()).unwrap();
        assert_eq!(aufloesung.partner, None);
        assert_eq!(reg.holen(&a).unwrap().zustand, VerbindungsZustand::Leerlauf);
    }
}
