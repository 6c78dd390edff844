//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::Context;
use rendezvous_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Liveness-Pruefung
    pub heartbeat: HeartbeatEinstellungen,
    /// Kapazitaeten der internen Queues
    pub queues: QueueEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Rendezvous".into(),
            max_clients: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den HTTP/WebSocket-Listener
    pub bind_adresse: String,
    /// Port fuer den HTTP/WebSocket-Listener
    pub port: u16,
    /// Pfad fuer das WebSocket-Upgrade
    pub ws_pfad: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
            ws_pfad: "/ws".into(),
        }
    }
}

/// Heartbeat-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatEinstellungen {
    /// Sekunden zwischen zwei Liveness-Proben
    pub intervall_sek: u64,
}

impl Default for HeartbeatEinstellungen {
    fn default() -> Self {
        Self { intervall_sek: 30 }
    }
}

/// Queue-Kapazitaeten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueEinstellungen {
    /// Zentrale Ereignis-Queue des Koordinators
    pub ereignis_groesse: usize,
    /// Ausgehende Queue pro Verbindung
    pub sende_groesse: usize,
}

impl Default for QueueEinstellungen {
    fn default() -> Self {
        Self {
            ereignis_groesse: 1024,
            sende_groesse: 64,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    ///
    /// Gibt `None` zurueck wenn die Datei nicht existiert. Der Aufrufer
    /// entscheidet ueber Standardwerte und meldet das erst, wenn das Logging
    /// laeuft.
    pub fn laden(pfad: &str) -> anyhow::Result<Option<Self>> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die Bind-Adresse fuer den WebSocket-Listener zurueck
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    /// Uebersetzt die Datei-Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_clients: self.server.max_clients,
            heartbeat_intervall: Duration::from_secs(self.heartbeat.intervall_sek.max(1)),
            ereignis_queue_groesse: self.queues.ereignis_groesse.max(1),
            send_queue_groesse: self.queues.sende_groesse.max(1),
            ws_pfad: self.netzwerk.ws_pfad.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_clients, 1024);
        assert_eq!(cfg.netzwerk.port, 8080);
        assert_eq!(cfg.netzwerk.ws_pfad, "/ws");
        assert_eq!(cfg.heartbeat.intervall_sek, 30);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse().unwrap().to_string(), "0.0.0.0:8080");

        let mut kaputt = ServerConfig::default();
        kaputt.netzwerk.bind_adresse = "nirgendwo".into();
        assert!(kaputt.bind_adresse().is_err());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Mein Rendezvous"
            max_clients = 100

            [heartbeat]
            intervall_sek = 10
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Mein Rendezvous");
        assert_eq!(cfg.server.max_clients, 100);
        assert_eq!(cfg.heartbeat.intervall_sek, 10);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.port, 8080);
        assert_eq!(cfg.queues.sende_groesse, 64);
    }

    #[test]
    fn signaling_config_uebernimmt_werte() {
        let mut cfg = ServerConfig::default();
        cfg.server.max_clients = 7;
        cfg.heartbeat.intervall_sek = 0;
        cfg.netzwerk.ws_pfad = "/signal".into();

        let sig = cfg.signaling_config();
        assert_eq!(sig.max_clients, 7);
        assert_eq!(sig.heartbeat_intervall, Duration::from_secs(1));
        assert_eq!(sig.ws_pfad, "/signal");
        assert_eq!(sig.send_queue_groesse, 64);
    }

    #[test]
    fn fehlende_datei_liefert_none() {
        assert!(ServerConfig::laden("/gibt/es/nicht/rendezvous.toml")
            .unwrap()
            .is_none());
    }

    #[test]
    fn datei_wird_gelesen() {
        let pfad = std::env::temp_dir().join(format!("rendezvous-test-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[netzwerk]\nport = 9100\n").unwrap();

        let cfg = ServerConfig::laden(pfad.to_str().unwrap()).unwrap().unwrap();
        assert_eq!(cfg.netzwerk.port, 9100);

        std::fs::remove_file(&pfad).unwrap();
    }

    #[test]
    fn kaputte_datei_ist_ein_fehler() {
        let pfad = std::env::temp_dir().join(format!("rendezvous-kaputt-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[netzwerk\nport = ").unwrap();

        assert!(ServerConfig::laden(pfad.to_str().unwrap()).is_err());

        std::fs::remove_file(&pfad).unwrap();
    }
}
