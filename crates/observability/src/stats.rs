//! In-Memory-Statistik fuer Rendezvous
//!
//! `StatistikZaehler` implementiert den `StatsSink` des Kerns mit atomaren
//! Zaehlern und einem begrenzten Log der letzten Paarungsdauern. Alle
//! Methoden sind nicht-blockierend (Atomics bzw. ein kurz gehaltener
//! parking_lot-Mutex) und duerfen im Koordinator aufgerufen werden.

use parking_lot::Mutex;
use rendezvous_core::StatsSink;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Standard-Anzahl gespeicherter Paarungsdauern
pub const STANDARD_DAUER_LOG_GROESSE: usize = 1000;

/// Momentaufnahme aller Zaehler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatistikSnapshot {
    /// Alle jemals beobachteten Verbindungen
    pub verbindungen_gesamt: u64,
    /// Aktuell offene Verbindungen
    pub verbindungen_aktiv: u64,
    /// Aktuell bestehende Paarungen
    pub paarungen_aktiv: u64,
    /// Alle jemals abgeschlossenen Paarungen
    pub paarungen_abgeschlossen: u64,
    /// Durchschnittliche Dauer abgeschlossener Paarungen in Sekunden
    pub durchschnitt_dauer_sek: f64,
    /// Die juengsten Paarungsdauern in Sekunden (aelteste zuerst)
    pub letzte_dauern_sek: Vec<f64>,
}

#[derive(Default)]
struct DauerLog {
    eintraege: VecDeque<f64>,
    summe_sek: f64,
}

/// Thread-safe Zaehler fuer Verbindungen und Paarungen
pub struct StatistikZaehler {
    verbindungen_gesamt: AtomicU64,
    verbindungen_aktiv: AtomicU64,
    paarungen_aktiv: AtomicU64,
    paarungen_abgeschlossen: AtomicU64,
    dauern: Mutex<DauerLog>,
    max_dauern: usize,
}

impl StatistikZaehler {
    /// Erstellt einen Zaehler mit Standard-Loggroesse
    pub fn neu() -> Self {
        Self::mit_log_groesse(STANDARD_DAUER_LOG_GROESSE)
    }

    /// Erstellt einen Zaehler der hoechstens `max_dauern` Dauern behaelt
    pub fn mit_log_groesse(max_dauern: usize) -> Self {
        Self {
            verbindungen_gesamt: AtomicU64::new(0),
            verbindungen_aktiv: AtomicU64::new(0),
            paarungen_aktiv: AtomicU64::new(0),
            paarungen_abgeschlossen: AtomicU64::new(0),
            dauern: Mutex::new(DauerLog::default()),
            max_dauern,
        }
    }

    /// Liefert eine konsistente Momentaufnahme der Dauern und aktuelle Zaehlerstaende
    pub fn snapshot(&self) -> StatistikSnapshot {
        let abgeschlossen = self.paarungen_abgeschlossen.load(Ordering::Relaxed);
        let (letzte_dauern_sek, summe_sek) = {
            let log = self.dauern.lock();
            (log.eintraege.iter().copied().collect(), log.summe_sek)
        };

        StatistikSnapshot {
            verbindungen_gesamt: self.verbindungen_gesamt.load(Ordering::Relaxed),
            verbindungen_aktiv: self.verbindungen_aktiv.load(Ordering::Relaxed),
            paarungen_aktiv: self.paarungen_aktiv.load(Ordering::Relaxed),
            paarungen_abgeschlossen: abgeschlossen,
            durchschnitt_dauer_sek: if abgeschlossen == 0 {
                0.0
            } else {
                summe_sek / abgeschlossen as f64
            },
            letzte_dauern_sek,
        }
    }
}

impl Default for StatistikZaehler {
    fn default() -> Self {
        Self::neu()
    }
}

/// Dekrementiert ohne Unterlauf
fn saettigend_dekrementieren(zaehler: &AtomicU64) {
    let _ = zaehler.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
}

impl StatsSink for StatistikZaehler {
    fn verbindung_geoeffnet(&self) {
        self.verbindungen_gesamt.fetch_add(1, Ordering::Relaxed);
        self.verbindungen_aktiv.fetch_add(1, Ordering::Relaxed);
    }

    fn verbindung_geschlossen(&self) {
        saettigend_dekrementieren(&self.verbindungen_aktiv);
    }

    fn paarung_gebildet(&self) {
        self.paarungen_aktiv.fetch_add(1, Ordering::Relaxed);
    }

    fn paarung_aufgeloest(&self, dauer_sek: f64) {
        saettigend_dekrementieren(&self.paarungen_aktiv);
        self.paarungen_abgeschlossen.fetch_add(1, Ordering::Relaxed);

        let mut log = self.dauern.lock();
        log.summe_sek += dauer_sek;
        if self.max_dauern == 0 {
            return;
        }
        if log.eintraege.len() == self.max_dauern {
            log.eintraege.pop_front();
        }
        log.eintraege.push_back(dauer_sek);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbindungen_zaehlen() {
        let z = StatistikZaehler::neu();
        z.verbindung_geoeffnet();
        z.verbindung_geoeffnet();
        z.verbindung_geschlossen();

        let s = z.snapshot();
        assert_eq!(s.verbindungen_gesamt, 2);
        assert_eq!(s.verbindungen_aktiv, 1);
    }

    #[test]
    fn paarungen_und_dauern() {
        let z = StatistikZaehler::neu();
        z.paarung_gebildet();
        z.paarung_gebildet();
        z.paarung_aufgeloest(2.0);
        z.paarung_aufgeloest(4.0);

        let s = z.snapshot();
        assert_eq!(s.paarungen_aktiv, 0);
        assert_eq!(s.paarungen_abgeschlossen, 2);
        assert_eq!(s.letzte_dauern_sek, vec![2.0, 4.0]);
        assert!((s.durchschnitt_dauer_sek - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kein_unterlauf_bei_doppeltem_aufloesen() {
        let z = StatistikZaehler::neu();
        z.verbindung_geschlossen();
        z.paarung_aufgeloest(1.0);

        let s = z.snapshot();
        assert_eq!(s.verbindungen_aktiv, 0);
        assert_eq!(s.paarungen_aktiv, 0);
    }

    #[test]
    fn dauer_log_ist_begrenzt() {
        let z = StatistikZaehler::mit_log_groesse(3);
        for i in 0..5 {
            z.paarung_aufgeloest(i as f64);
        }

        let s = z.snapshot();
        assert_eq!(s.letzte_dauern_sek, vec![2.0, 3.0, 4.0]);
        assert_eq!(s.paarungen_abgeschlossen, 5);
        // Durchschnitt ueber alle, nicht nur die behaltenen
        assert!((s.durchschnitt_dauer_sek - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_ist_serialisierbar() {
        let z = StatistikZaehler::neu();
        z.verbindung_geoeffnet();
        let json = serde_json::to_value(z.snapshot()).unwrap();
        assert_eq!(json["verbindungen_gesamt"], 1);
    }
}
