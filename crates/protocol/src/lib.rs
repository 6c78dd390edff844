//! rendezvous-protocol – Nachrichten des Signaling-Protokolls
//!
//! Dieses Crate definiert alle JSON-Nachrichten die ueber die
//! WebSocket-Verbindung zwischen Browser und Server ausgetauscht werden.

pub mod control;
pub mod error;

pub use control::{ClientNachricht, MatchPayload, Rolle, ServerNachricht, TextPayload};
pub use error::ProtokollFehler;
