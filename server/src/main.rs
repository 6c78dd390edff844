//! Rendezvous Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use rendezvous_observability::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
use rendezvous_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("RENDEZVOUS_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let geladen = ServerConfig::laden(&config_pfad)?;
    let datei_gefunden = geladen.is_some();
    let config = geladen.unwrap_or_default();

    // Logging initialisieren, erst danach kann gewarnt werden
    logging_initialisieren(&config.logging.level, &config.logging.format);

    if !datei_gefunden {
        tracing::warn!(
            pfad = %config_pfad,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    if !log_level_gueltig(&config.logging.level) {
        tracing::warn!(level = %config.logging.level, "Unbekanntes Log-Level in der Konfiguration");
    }
    if !log_format_gueltig(&config.logging.format) {
        tracing::warn!(format = %config.logging.format, "Unbekanntes Log-Format, verwende text");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Rendezvous Server wird initialisiert"
    );

    // Server starten
    let server = Server::neu(config);
    server.starten().await?;

    Ok(())
}
