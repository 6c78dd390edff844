//! Signaling-Relay – Opake Weiterleitung an den Partner
//!
//! Der Relay schaut nie in den Payload. `offer`, `answer` und `ice` werden
//! gleich behandelt; die Semantik gehoert dem Browser.

use rendezvous_core::ConnectionId;
use rendezvous_protocol::ServerNachricht;
use serde_json::Value;

use crate::registry::ConnectionRegistry;

/// Ergebnis einer Weiterleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErgebnis {
    /// Payload wurde in die Queue des Partners eingereiht
    Zugestellt { partner: ConnectionId },
    /// Absender ist nicht gepaart, Payload verworfen
    KeinPartner,
    /// Partner-ID loest nicht mehr auf, Payload verworfen
    PartnerVerschwunden { partner: ConnectionId },
    /// Absender ist nicht registriert
    UnbekannterAbsender,
}

/// Leitet Verhandlungsnachrichten zwischen Partnern weiter
pub struct SignalingRelay;

impl SignalingRelay {
    /// Leitet `payload` von `von` unveraendert an dessen Partner weiter
    ///
    /// Veraendert keinen Zustand. Aufraeumen nach `PartnerVerschwunden` ist
    /// Sache des Koordinators.
    pub fn weiterleiten(
        registry: &ConnectionRegistry,
        von: ConnectionId,
        payload: Value,
    ) -> RelayErgebnis {
        let Some(absender) = registry.holen(&von) else {
            return RelayErgebnis::UnbekannterAbsender;
        };
        let Some(partner) = absender.partner() else {
            return RelayErgebnis::KeinPartner;
        };

        match registry.holen(&partner) {
            Some(ziel) if ziel.partner() == Some(von) => {
                ziel.senden(ServerNachricht::signal(payload));
                tracing::trace!(von = %von, an = %partner, "Signal weitergeleitet");
                RelayErgebnis::Zugestellt { partner }
            }
            _ => RelayErgebnis::PartnerVerschwunden { partner },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::PairingSession;
    use crate::sender::Ausgehend;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn payload_kommt_unveraendert_an() {
        let mut reg = ConnectionRegistry::neu();
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = reg.registrieren(tx_a);
        let b = reg.registrieren(tx_b);
        PairingSession::bilden(&mut reg, a, b, Utc::now()).unwrap();
        let _match = rx_b.try_recv();

        let payload = json!({"kind":"offer","data":{"sdp":"v=0","weird":[1,null,"x"]}});
        assert_eq!(
            SignalingRelay::weiterleiten(&reg, a, payload.clone()),
            RelayErgebnis::Zugestellt { partner: b }
        );
        assert_eq!(
            rx_b.try_recv().unwrap(),
            Ausgehend::Nachricht(ServerNachricht::signal(payload))
        );
    }

    #[test]
    fn ohne_partner_wird_verworfen() {
        let mut reg = ConnectionRegistry::neu();
        let (tx, _rx) = mpsc::channel(8);
        let a = reg.registrieren(tx);

        assert_eq!(
            SignalingRelay::weiterleiten(&reg, a, json!({"kind":"ice"})),
            RelayErgebnis::KeinPartner
        );
    }

    #[test]
    fn verschwundener_partner() {
        let mut reg = ConnectionRegistry::neu();
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        let a = reg.registrieren(tx_a);
        let b = reg.registrieren(tx_b);
        PairingSession::bilden(&mut reg, a, b, Utc::now()).unwrap();
        reg.entfernen(&b);

        assert_eq!(
            SignalingRelay::weiterleiten(&reg, a, json!(null)),
            RelayErgebnis::PartnerVerschwunden { partner: b }
        );
    }

    #[test]
    fn unbekannter_absender() {
        let reg = ConnectionRegistry::neu();
        assert_eq!(
            SignalingRelay::weiterleiten(&reg, ConnectionId::new(), json!(1)),
            RelayErgebnis::UnbekannterAbsender
        );
    }
}
