//! Control-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die zwischen Browser und Server ausgetauscht
//! werden.
//!
//! ## Design
//! - Jede Nachricht ist ein JSON-Objekt mit einem `type`-Feld
//! - Tagged Enums fuer typsichere Nachrichtentypen
//! - Der `signal`-Payload bleibt ein opaker JSON-Wert, der Server reicht ihn
//!   unveraendert an den Partner weiter

use rendezvous_core::types::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtokollFehler;

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachrichten vom Browser an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientNachricht {
    /// Partner anfordern
    Ready,
    /// Verhandlungsnachricht an den aktuellen Partner weiterleiten
    Signal { payload: Value },
    /// Aktuelle Paarung bzw. Warteschlange verlassen
    Leave,
}

impl ClientNachricht {
    /// Alle Werte die das `type`-Feld annehmen darf
    pub const BEKANNTE_TYPEN: &'static [&'static str] = &["ready", "signal", "leave"];

    /// Parst eine eingehende Textnachricht
    ///
    /// Unterscheidet zwischen kaputtem JSON, fehlendem bzw. unbekanntem
    /// `type` und bekannten Typen mit ungueltigen Feldern, damit der Client
    /// eine brauchbare Fehlermeldung bekommt.
    pub fn parsen(text: &str) -> Result<Self, ProtokollFehler> {
        let wert: Value = serde_json::from_str(text).map_err(ProtokollFehler::UngueltigesJson)?;

        let typ = match wert.get("type").and_then(Value::as_str) {
            Some(t) => t.to_owned(),
            None => return Err(ProtokollFehler::TypFehlt),
        };

        if !Self::BEKANNTE_TYPEN.contains(&typ.as_str()) {
            return Err(ProtokollFehler::UnbekannterTyp(typ));
        }

        serde_json::from_value(wert).map_err(|quelle| ProtokollFehler::UngueltigeFelder { typ, quelle })
    }

    /// Typ-Name fuer Logging
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Signal { .. } => "signal",
            Self::Leave => "leave",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Rolle eines Partners in der Verhandlung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    /// Startet die Verhandlung (sendet das Offer)
    Offerer,
    /// Antwortet auf das Offer
    Answerer,
}

/// Payload von `status` und `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub message: String,
}

/// Payload von `match`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPayload {
    #[serde(rename = "partnerId")]
    pub partner_id: ConnectionId,
    pub role: Rolle,
}

/// Nachrichten vom Server an den Browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerNachricht {
    /// Information ohne Zustandsbedeutung fuer den Empfaenger
    Status { payload: TextPayload },
    /// Paarung gebildet
    Match { payload: MatchPayload },
    /// Weitergeleiteter Verhandlungs-Payload, unveraendert
    Signal { payload: Value },
    /// Der Partner hat die Paarung verlassen oder die Verbindung verloren
    PartnerLeft,
    /// Ungueltige Eingabe oder Protokoll-Missbrauch, Verbindung bleibt offen
    Error { payload: TextPayload },
}

impl ServerNachricht {
    /// Erstellt eine Status-Nachricht
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            payload: TextPayload {
                message: message.into(),
            },
        }
    }

    /// Erstellt eine Fehler-Nachricht
    pub fn fehler(message: impl Into<String>) -> Self {
        Self::Error {
            payload: TextPayload {
                message: message.into(),
            },
        }
    }

    /// Erstellt eine Match-Nachricht
    pub fn paarung(partner_id: ConnectionId, role: Rolle) -> Self {
        Self::Match {
            payload: MatchPayload { partner_id, role },
        }
    }

    /// Verpackt einen weitergeleiteten Payload
    pub fn signal(payload: Value) -> Self {
        Self::Signal { payload }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ready_und_leave_parsen() {
        assert_eq!(
            ClientNachricht::parsen(r#"{"type":"ready"}"#).unwrap(),
            ClientNachricht::Ready
        );
        assert_eq!(
            ClientNachricht::parsen(r#"{"type":"leave"}"#).unwrap(),
            ClientNachricht::Leave
        );
    }

    #[test]
    fn signal_payload_bleibt_opak() {
        let text = r#"{"type":"signal","payload":{"kind":"ice","data":{"candidate":"a=1","sdpMLineIndex":0}}}"#;
        match ClientNachricht::parsen(text).unwrap() {
            ClientNachricht::Signal { payload } => {
                assert_eq!(
                    payload,
                    json!({"kind":"ice","data":{"candidate":"a=1","sdpMLineIndex":0}})
                );
            }
            andere => panic!("Erwartet Signal, erhalten {andere:?}"),
        }
    }

    #[test]
    fn unbekannte_kind_wird_nicht_validiert() {
        let text = r#"{"type":"signal","payload":{"kind":"renegotiate","data":42}}"#;
        assert!(matches!(
            ClientNachricht::parsen(text),
            Ok(ClientNachricht::Signal { .. })
        ));
    }

    #[test]
    fn kaputtes_json() {
        assert!(matches!(
            ClientNachricht::parsen("{nicht json"),
            Err(ProtokollFehler::UngueltigesJson(_))
        ));
    }

    #[test]
    fn fehlender_typ() {
        assert!(matches!(
            ClientNachricht::parsen(r#"{"payload":1}"#),
            Err(ProtokollFehler::TypFehlt)
        ));
        assert!(matches!(
            ClientNachricht::parsen(r#"[1,2,3]"#),
            Err(ProtokollFehler::TypFehlt)
        ));
    }

    #[test]
    fn unbekannter_typ() {
        match ClientNachricht::parsen(r#"{"type":"dance"}"#) {
            Err(ProtokollFehler::UnbekannterTyp(t)) => assert_eq!(t, "dance"),
            andere => panic!("Erwartet UnbekannterTyp, erhalten {andere:?}"),
        }
    }

    #[test]
    fn signal_ohne_payload_ist_ungueltig() {
        assert!(matches!(
            ClientNachricht::parsen(r#"{"type":"signal"}"#),
            Err(ProtokollFehler::UngueltigeFelder { .. })
        ));
    }

    #[test]
    fn match_json_format() {
        let partner = ConnectionId::new();
        let wert: Value =
            serde_json::from_str(&ServerNachricht::paarung(partner, Rolle::Offerer).to_json().unwrap())
                .unwrap();
        assert_eq!(
            wert,
            json!({
                "type": "match",
                "payload": { "partnerId": partner.inner().to_string(), "role": "offerer" }
            })
        );
    }

    #[test]
    fn partner_left_ohne_payload() {
        assert_eq!(
            ServerNachricht::PartnerLeft.to_json().unwrap(),
            r#"{"type":"partner_left"}"#
        );
    }

    #[test]
    fn status_und_error_format() {
        let status: Value =
            serde_json::from_str(&ServerNachricht::status("waiting").to_json().unwrap()).unwrap();
        assert_eq!(status, json!({"type":"status","payload":{"message":"waiting"}}));

        let fehler: Value =
            serde_json::from_str(&ServerNachricht::fehler("kaputt").to_json().unwrap()).unwrap();
        assert_eq!(fehler, json!({"type":"error","payload":{"message":"kaputt"}}));
    }

    #[test]
    fn signal_wird_unveraendert_verpackt() {
        let payload = json!({"kind":"offer","data":{"sdp":"v=0\r\n","type":"offer"}});
        let wert: Value =
            serde_json::from_str(&ServerNachricht::signal(payload.clone()).to_json().unwrap())
                .unwrap();
        assert_eq!(wert["type"], "signal");
        assert_eq!(wert["payload"], payload);
    }
}
