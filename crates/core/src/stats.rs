//! Statistik-Collaborator – Schnittstelle fuer aggregierte Zaehler
//!
//! Der Signaling-Kern ruft diese Methoden als Seiteneffekt seiner
//! Zustandsuebergaenge auf. Formatierung und Auslieferung der Zahlen sind
//! Sache der Implementierung.
//!
//! Implementierungen laufen im Kontext des Koordinators und duerfen daher
//! nicht blockieren. Teure Arbeit (Disk, Netzwerk) muss fire-and-forget
//! ausgelagert werden.

use std::sync::Arc;

/// Empfaenger fuer Verbindungs- und Paarungs-Statistiken
pub trait StatsSink: Send + Sync + 'static {
    /// Eine neue Verbindung wurde registriert
    fn verbindung_geoeffnet(&self);

    /// Eine registrierte Verbindung wurde entfernt
    fn verbindung_geschlossen(&self);

    /// Eine Paarung wurde gebildet
    fn paarung_gebildet(&self);

    /// Eine Paarung wurde aufgeloest, `dauer_sek` ist ihre Lebensdauer
    fn paarung_aufgeloest(&self, dauer_sek: f64);
}

impl<T: StatsSink + ?Sized> StatsSink for Arc<T> {
    fn verbindung_geoeffnet(&self) {
        (**self).verbindung_geoeffnet();
    }

    fn verbindung_geschlossen(&self) {
        (**self).verbindung_geschlossen();
    }

    fn paarung_gebildet(&self) {
        (**self).paarung_gebildet();
    }

    fn paarung_aufgeloest(&self, dauer_sek: f64) {
        (**self).paarung_aufgeloest(dauer_sek);
    }
}
