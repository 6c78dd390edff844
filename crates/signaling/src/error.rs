//! Fehlertypen fuer den Signaling-Service

use rendezvous_core::ConnectionId;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
///
/// Kein Fehler ist prozess-fatal: Protokollfehler gehen als `error` an den
/// Absender, alles andere wird geloggt und die Verbindung ggf. abgebaut.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Verbindung ist nicht (mehr) registriert
    #[error("Unbekannte Verbindung: {0}")]
    UnbekannteVerbindung(ConnectionId),

    /// Eine Verbindung kann nicht mit sich selbst gepaart werden
    #[error("Selbst-Paarung abgelehnt: {0}")]
    SelbstPaarung(ConnectionId),

    /// Verbindung ist bereits gepaart
    #[error("Bereits gepaart: {0}")]
    BereitsGepaart(ConnectionId),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// Der Koordinator-Task laeuft nicht mehr
    #[error("Koordinator beendet")]
    KoordinatorBeendet,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
