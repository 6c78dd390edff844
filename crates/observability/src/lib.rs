//! # rendezvous-observability
//!
//! Observability-Crate fuer Rendezvous:
//! - Structured Logging via tracing-subscriber (Text oder JSON)
//! - `StatistikZaehler` – In-Memory-Implementierung des Statistik-Collaborators

pub mod logging;
pub mod stats;

pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
pub use stats::{StatistikSnapshot, StatistikZaehler};
