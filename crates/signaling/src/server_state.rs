//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Die eigentlichen Zustands-Manager (Registry, Queue) gehoeren exklusiv dem
//! Koordinator-Task. Geteilt wird nur, was die Transport-Tasks brauchen:
//! die Konfiguration und das Handle auf die Ereignis-Queue.

use std::sync::Arc;
use std::time::Duration;

use crate::coordinator::CoordinatorHandle;
use crate::heartbeat::STANDARD_PERIODE;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Periode des Heartbeat-Monitors
    pub heartbeat_intervall: Duration,
    /// Kapazitaet der zentralen Ereignis-Queue
    pub ereignis_queue_groesse: usize,
    /// Kapazitaet der ausgehenden Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// HTTP-Pfad fuer das WebSocket-Upgrade
    pub ws_pfad: String,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 1024,
            heartbeat_intervall: STANDARD_PERIODE,
            ereignis_queue_groesse: 1024,
            send_queue_groesse: 64,
            ws_pfad: "/ws".to_string(),
        }
    }
}

/// Zustand der Transport-Schicht (Arc-geteilt, Clone ist billig)
#[derive(Clone)]
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Ereignis-Queue des Koordinators
    pub koordinator: CoordinatorHandle,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, koordinator: CoordinatorHandle) -> Self {
        Self {
            config: Arc::new(config),
            koordinator,
        }
    }
}
