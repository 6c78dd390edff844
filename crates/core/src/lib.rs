//! rendezvous-core – Gemeinsame Typen und Collaborator-Traits
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! Rendezvous-Crates gemeinsam genutzt werden: die Verbindungs-ID und die
//! Schnittstelle zum Statistik-Collaborator.

pub mod stats;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use stats::StatsSink;
pub use types::ConnectionId;
