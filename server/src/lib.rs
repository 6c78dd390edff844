//! rendezvous-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use rendezvous_observability::StatistikZaehler;
use rendezvous_signaling::{SessionCoordinator, SignalingServer, SignalingState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    stats: Arc<StatistikZaehler>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self {
            config,
            stats: Arc::new(StatistikZaehler::neu()),
        }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Listener binden (Fehler wie belegter Port kehren sofort zurueck)
    /// 2. Session-Koordinator starten
    /// 3. WebSocket-Server starten
    /// 4. Auf Ctrl-C oder vorzeitiges Ende des Servers warten
    /// 5. Shutdown signalisieren, Tasks abwarten, Statistik loggen
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self.config.bind_adresse()?;
        let signaling_config = self.config.signaling_config();

        // 1. Listener
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Listener auf {bind_addr} konnte nicht gebunden werden"))?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            pfad = %signaling_config.ws_pfad,
            max_clients = signaling_config.max_clients,
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // 2. Koordinator
        let (handle, koordinator_task) =
            SessionCoordinator::neu(&signaling_config, Arc::clone(&self.stats))
                .starten(signaling_config.ereignis_queue_groesse, shutdown_rx.clone());

        // 3. WebSocket-Server
        let state = SignalingState::neu(signaling_config, handle);
        let mut server_task =
            tokio::spawn(SignalingServer::neu(state, listener).starten(shutdown_rx));

        // 4. Ctrl-C oder vorzeitiges Ende
        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        let server_ergebnis = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                None
            }
            ergebnis = &mut server_task => {
                tracing::error!("WebSocket-Server hat sich unerwartet beendet");
                Some(ergebnis)
            }
        };

        // 5. Shutdown
        let _ = shutdown_tx.send(true);
        koordinator_task
            .await
            .context("Koordinator-Task abgebrochen")?;
        let server_ergebnis = match server_ergebnis {
            Some(ergebnis) => ergebnis,
            None => server_task.await,
        };
        server_ergebnis
            .context("Signaling-Task abgebrochen")?
            .context("WebSocket-Server fehlgeschlagen")?;

        let snapshot = self.stats.snapshot();
        tracing::info!(
            statistik = %serde_json::to_string(&snapshot)?,
            "Server beendet"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn belegter_port_wird_sofort_gemeldet() {
        let belegt = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = belegt.local_addr().unwrap().port();

        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.port = port;

        let ergebnis = tokio::time::timeout(Duration::from_secs(3), Server::neu(config).starten())
            .await
            .expect("starten darf bei belegtem Port nicht haengen");

        let fehler = ergebnis.expect_err("Bind-Fehler muss zurueckgegeben werden");
        assert!(fehler.to_string().contains("konnte nicht gebunden werden"));
        drop(belegt);
    }

    #[tokio::test]
    async fn ungueltige_bind_adresse_wird_gemeldet() {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "kein-host".into();

        assert!(Server::neu(config).starten().await.is_err());
    }
}
