//! rendezvous-signaling – WebSocket Signaling und Matchmaking
//!
//! Dieser Crate implementiert den Rendezvous-Service: anonyme Browser
//! verbinden sich per WebSocket, melden sich mit `ready` an, werden paarweise
//! zusammengefuehrt und tauschen ueber den Server ihre WebRTC-Verhandlung
//! (offer, answer, ICE) aus. Medien fliessen nie ueber den Server.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer, axum)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Frames -> Ereignis, Ausgehend -> Frames
//!     v
//! mpsc<Ereignis> (eine serialisierte Queue)
//!     |
//!     v
//! SessionCoordinator (ein Task, einziger Schreiber)
//!     +-- ConnectionRegistry (Verbindungen + Zustand)
//!     +-- MatchingQueue      (FIFO der Wartenden)
//!     +-- PairingSession     (Partner-Verknuepfung bilden/aufloesen)
//!     +-- SignalingRelay     (opake Weiterleitung an den Partner)
//!     +-- HeartbeatMonitor   (Liveness per Ping/Pong)
//! ```

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod heartbeat;
pub mod pairing;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod sender;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use coordinator::{CoordinatorHandle, Ereignis, SessionCoordinator, TrennGrund};
pub use error::{SignalingError, SignalingResult};
pub use heartbeat::HeartbeatMonitor;
pub use pairing::PairingSession;
pub use queue::MatchingQueue;
pub use registry::{Connection, ConnectionRegistry, VerbindungsZustand};
pub use relay::{RelayErgebnis, SignalingRelay};
pub use sender::Ausgehend;
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::SignalingServer;
