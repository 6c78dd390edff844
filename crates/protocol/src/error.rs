//! Fehlertypen fuer das Parsen eingehender Nachrichten

use thiserror::Error;

/// Fehler beim Interpretieren einer Client-Nachricht
///
/// Jeder Fehler fuehrt zu einer `error`-Antwort an den Absender, nie zu
/// einer Zustandsaenderung.
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    /// Kein gueltiges JSON
    #[error("invalid JSON: {0}")]
    UngueltigesJson(#[source] serde_json::Error),

    /// JSON-Objekt ohne `type`-Feld
    #[error("missing message type")]
    TypFehlt,

    /// `type` ist keiner der bekannten Nachrichtentypen
    #[error("unknown message type: {0}")]
    UnbekannterTyp(String),

    /// Bekannter Typ, aber Felder passen nicht
    #[error("malformed {typ} message: {quelle}")]
    UngueltigeFelder {
        typ: String,
        #[source]
        quelle: serde_json::Error,
    },
}
