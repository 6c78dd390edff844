//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `RV_LOG_LEVEL`: Filter-Ausdruck (z.B. `debug` oder `rendezvous_signaling=trace`)
//! - `RV_LOG_FORMAT`: Format (text/json)
//!
//! Die Umgebung hat Vorrang vor den Werten aus der Konfigurationsdatei.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const LOG_LEVEL_ENV: &str = "RV_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const LOG_FORMAT_ENV: &str = "RV_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Faellt auf `info` zurueck wenn weder Umgebung noch `level` einen
/// gueltigen Filter ergeben. Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level} muss gueltig sein");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }
}
