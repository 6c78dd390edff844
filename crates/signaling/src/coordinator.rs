//! Session-Koordinator – Einziger Schreiber des Signaling-Zustands
//!
//! Alle Ereignisquellen (eingehende Nachrichten, Socket-Close, Pong,
//! Heartbeat-Takt) laufen ueber eine einzige mpsc-Queue in den
//! Koordinator-Task. Jeder Handler laeuft synchron bis zum Ende; Registry,
//! Queue und Partner-Verknuepfungen werden daher nie nebenlaeufig veraendert
//! und brauchen keine Locks.
//!
//! ## State Machine
//! ```text
//! Leerlauf --ready--> Wartend --match--> Gepaart
//!     |                  |                  |
//!     +------ready-------+----------------->+
//!     ^                                     |
//!     +--leave / disconnect / heartbeat ----+  (Partner: partner_left -> Leerlauf)
//! ```

use chrono::Utc;
use rendezvous_core::{ConnectionId, StatsSink};
use rendezvous_protocol::{ClientNachricht, ServerNachricht};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{SignalingError, SignalingResult};
use crate::heartbeat::HeartbeatMonitor;
use crate::pairing::PairingSession;
use crate::queue::MatchingQueue;
use crate::registry::{ConnectionRegistry, VerbindungsZustand};
use crate::relay::{RelayErgebnis, SignalingRelay};
use crate::sender::Ausgehend;
use crate::server_state::SignalingConfig;

// ---------------------------------------------------------------------------
// Status-Texte (gehen unveraendert an den Browser)
// ---------------------------------------------------------------------------

pub const STATUS_WARTEND: &str = "Waiting for a partner...";
pub const STATUS_BEREITS_GEPAART: &str =
    "You already have a partner. Leave the current conversation first.";
pub const STATUS_BEREITS_WARTEND: &str = "You are already waiting for a partner.";
pub const STATUS_KEIN_PARTNER: &str = "No partner connected yet, signal dropped.";
pub const STATUS_QUEUE_VERLASSEN: &str = "You left the waiting queue.";
pub const STATUS_PAARUNG_VERLASSEN: &str = "You left the conversation.";

// ---------------------------------------------------------------------------
// Ereignisse
// ---------------------------------------------------------------------------

/// Warum eine Verbindung entfernt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrennGrund {
    /// Client hat die Verbindung geschlossen
    Geschlossen,
    /// Lese- oder Schreibfehler auf dem Socket
    Transportfehler,
    /// Heartbeat-Probe nicht beantwortet
    Zeitueberschreitung,
    /// Server faehrt herunter
    Shutdown,
}

impl std::fmt::Display for TrennGrund {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Geschlossen => "geschlossen",
            Self::Transportfehler => "transportfehler",
            Self::Zeitueberschreitung => "zeitueberschreitung",
            Self::Shutdown => "shutdown",
        };
        f.write_str(text)
    }
}

/// Ereignis fuer die serialisierte Queue des Koordinators
#[derive(Debug)]
pub enum Ereignis {
    /// Neue Transport-Verbindung; Antwort ist die vergebene ID
    Verbunden {
        tx: mpsc::Sender<Ausgehend>,
        antwort: oneshot::Sender<SignalingResult<ConnectionId>>,
    },
    /// Textnachricht vom Browser
    Nachricht { id: ConnectionId, text: String },
    /// Liveness-Bestaetigung
    Pong { id: ConnectionId },
    /// Transport-Verbindung ist weg
    Getrennt { id: ConnectionId, grund: TrennGrund },
}

/// Vorheriger Zustand einer abgebauten Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abbau {
    Leerlauf,
    Wartend,
    Gepaart,
}

// ---------------------------------------------------------------------------
// SessionCoordinator
// ---------------------------------------------------------------------------

/// Besitzt Registry und Queue und setzt die Protokoll-State-Machine durch
pub struct SessionCoordinator<S: StatsSink> {
    registry: ConnectionRegistry,
    queue: MatchingQueue,
    heartbeat: HeartbeatMonitor,
    stats: S,
    max_clients: usize,
}

impl<S: StatsSink> SessionCoordinator<S> {
    /// Erstellt einen neuen Koordinator
    pub fn neu(config: &SignalingConfig, stats: S) -> Self {
        Self {
            registry: ConnectionRegistry::neu(),
            queue: MatchingQueue::neu(),
            heartbeat: HeartbeatMonitor::neu(config.heartbeat_intervall),
            stats,
            max_clients: config.max_clients as usize,
        }
    }

    /// Lesezugriff auf die Registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Lesezugriff auf die Warteschlange
    pub fn queue(&self) -> &MatchingQueue {
        &self.queue
    }

    /// Verarbeitet ein einzelnes Ereignis vollstaendig
    pub fn verarbeiten(&mut self, ereignis: Ereignis) {
        match ereignis {
            Ereignis::Verbunden { tx, antwort } => {
                let ergebnis = self.verbinden(tx);
                if let Err(Ok(id)) = antwort.send(ergebnis) {
                    // Transport-Task ist bereits weg
                    self.trennen(id, TrennGrund::Geschlossen);
                }
            }
            Ereignis::Nachricht { id, text } => self.nachricht(id, &text),
            Ereignis::Pong { id } => self.pong(id),
            Ereignis::Getrennt { id, grund } => self.trennen(id, grund),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Registriert eine neue Verbindung
    pub fn verbinden(&mut self, tx: mpsc::Sender<Ausgehend>) -> SignalingResult<ConnectionId> {
        if self.registry.anzahl() >= self.max_clients {
            tracing::warn!(max = self.max_clients, "Server voll – Verbindung abgelehnt");
            return Err(SignalingError::ServerVoll);
        }

        let id = self.registry.registrieren(tx);
        self.stats.verbindung_geoeffnet();
        tracing::info!(connection = %id, online = self.registry.anzahl(), "Verbindung hergestellt");
        Ok(id)
    }

    /// Entfernt eine Verbindung nach dem gleichen Teardown wie bei `leave`
    ///
    /// Idempotent: Close-Event und Heartbeat duerfen sich ueberholen.
    pub fn trennen(&mut self, id: ConnectionId, grund: TrennGrund) {
        if !self.registry.enthaelt(&id) {
            tracing::trace!(connection = %id, %grund, "Trennen fuer bereits entfernte Verbindung");
            return;
        }

        self.abbauen(id);
        self.registry.entfernen(&id);
        self.stats.verbindung_geschlossen();

        tracing::info!(
            connection = %id,
            %grund,
            online = self.registry.anzahl(),
            "Verbindung entfernt"
        );
    }

    /// Liveness-Bestaetigung einer Verbindung
    pub fn pong(&mut self, id: ConnectionId) {
        if let Some(conn) = self.registry.holen_mut(&id) {
            conn.ist_aktiv = true;
            tracing::trace!(connection = %id, "Pong empfangen");
        }
    }

    /// Ein Heartbeat-Zyklus: tote Verbindungen schliessen und abbauen
    pub fn heartbeat(&mut self) {
        for id in self.heartbeat.pruefen(&mut self.registry) {
            if let Some(conn) = self.registry.holen(&id) {
                conn.schliessen();
            }
            tracing::warn!(connection = %id, "Heartbeat-Timeout – Verbindung wird geschlossen");
            self.trennen(id, TrennGrund::Zeitueberschreitung);
        }
    }

    /// Schliesst und entfernt alle Verbindungen (Shutdown)
    pub fn alle_schliessen(&mut self) {
        for id in self.registry.ids() {
            if let Some(conn) = self.registry.holen(&id) {
                conn.schliessen();
            }
            self.trennen(id, TrennGrund::Shutdown);
        }
    }

    // -----------------------------------------------------------------------
    // Nachrichten
    // -----------------------------------------------------------------------

    /// Parst und dispatcht eine Textnachricht
    ///
    /// Ungueltige Nachrichten erzeugen eine `error`-Antwort und veraendern
    /// keinen Zustand.
    pub fn nachricht(&mut self, id: ConnectionId, text: &str) {
        if !self.registry.enthaelt(&id) {
            tracing::debug!(connection = %id, "Nachricht von unbekannter Verbindung verworfen");
            return;
        }

        match ClientNachricht::parsen(text) {
            Ok(nachricht) => {
                tracing::trace!(connection = %id, typ = nachricht.typ(), "Nachricht empfangen");
                match nachricht {
                    ClientNachricht::Ready => self.bereit(id),
                    ClientNachricht::Signal { payload } => self.signal(id, payload),
                    ClientNachricht::Leave => self.verlassen(id),
                }
            }
            Err(fehler) => {
                tracing::debug!(connection = %id, %fehler, "Ungueltige Nachricht");
                self.senden(id, ServerNachricht::fehler(fehler.to_string()));
            }
        }
    }

    /// `ready`: sofort paaren oder einreihen
    ///
    /// Der am laengsten Wartende wird zuerst gepaart und bekommt die Rolle
    /// des Offerers. Veraltete Queue-Eintraege werden uebersprungen.
    pub fn bereit(&mut self, id: ConnectionId) {
        let Some(conn) = self.registry.holen(&id) else {
            return;
        };
        match conn.zustand {
            VerbindungsZustand::Gepaart { .. } => {
                conn.senden(ServerNachricht::status(STATUS_BEREITS_GEPAART));
                return;
            }
            VerbindungsZustand::Wartend => {
                conn.senden(ServerNachricht::status(STATUS_BEREITS_WARTEND));
                return;
            }
            VerbindungsZustand::Leerlauf => {}
        }

        while let Some(kandidat) = self.queue.naechster() {
            if kandidat == id {
                continue;
            }
            let gueltig = self
                .registry
                .holen(&kandidat)
                .is_some_and(|k| k.ist_wartend());
            if !gueltig {
                tracing::debug!(connection = %kandidat, "Veralteter Queue-Eintrag uebersprungen");
                continue;
            }

            match PairingSession::bilden(&mut self.registry, kandidat, id, Utc::now()) {
                Ok(()) => {
                    self.stats.paarung_gebildet();
                    return;
                }
                Err(fehler) => {
                    tracing::warn!(connection = %id, kandidat = %kandidat, %fehler, "Paarung fehlgeschlagen");
                }
            }
        }

        self.queue.einreihen(id);
        if let Some(conn) = self.registry.holen_mut(&id) {
            conn.zustand = VerbindungsZustand::Wartend;
            conn.senden(ServerNachricht::status(STATUS_WARTEND));
        }
        tracing::debug!(connection = %id, wartend = self.queue.laenge(), "Verbindung wartet");
    }

    /// `signal`: opake Weiterleitung an den Partner
    pub fn signal(&mut self, id: ConnectionId, payload: Value) {
        match SignalingRelay::weiterleiten(&self.registry, id, payload) {
            RelayErgebnis::Zugestellt { .. } => {}
            RelayErgebnis::KeinPartner => {
                self.senden(id, ServerNachricht::status(STATUS_KEIN_PARTNER));
            }
            RelayErgebnis::PartnerVerschwunden { partner } => {
                tracing::warn!(connection = %id, partner = %partner, "Partner verschwunden – Paarung wird abgebaut");
                if let Some(aufloesung) = PairingSession::aufloesen(&mut self.registry, id, Utc::now()) {
                    self.stats.paarung_aufgeloest(aufloesung.dauer_sek);
                }
                self.senden(id, ServerNachricht::PartnerLeft);
            }
            RelayErgebnis::UnbekannterAbsender => {
                tracing::debug!(connection = %id, "Signal von unbekannter Verbindung");
            }
        }
    }

    /// `leave`: Queue bzw. Paarung verlassen, Verbindung bleibt bestehen
    pub fn verlassen(&mut self, id: ConnectionId) {
        let text = match self.abbauen(id) {
            Some(Abbau::Wartend) => STATUS_QUEUE_VERLASSEN,
            Some(Abbau::Gepaart) => STATUS_PAARUNG_VERLASSEN,
            Some(Abbau::Leerlauf) | None => return,
        };
        self.senden(id, ServerNachricht::status(text));
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Gemeinsamer Teardown fuer leave, disconnect und Heartbeat-Timeout
    ///
    /// Bringt `id` nach `Leerlauf`. War sie gepaart, geht der Partner im
    /// selben Schritt nach `Leerlauf` und bekommt `partner_left`.
    fn abbauen(&mut self, id: ConnectionId) -> Option<Abbau> {
        let zustand = self.registry.holen(&id)?.zustand;

        match zustand {
            VerbindungsZustand::Leerlauf => {
                self.queue.entfernen(&id);
                Some(Abbau::Leerlauf)
            }
            VerbindungsZustand::Wartend => {
                self.queue.entfernen(&id);
                if let Some(conn) = self.registry.holen_mut(&id) {
                    conn.zustand = VerbindungsZustand::Leerlauf;
                }
                Some(Abbau::Wartend)
            }
            VerbindungsZustand::Gepaart { .. } => {
                if let Some(aufloesung) = PairingSession::aufloesen(&mut self.registry, id, Utc::now()) {
                    self.stats.paarung_aufgeloest(aufloesung.dauer_sek);
                    if let Some(partner) = aufloesung.partner {
                        self.senden(partner, ServerNachricht::PartnerLeft);
                    }
                }
                Some(Abbau::Gepaart)
            }
        }
    }

    fn senden(&self, id: ConnectionId, nachricht: ServerNachricht) {
        if let Some(conn) = self.registry.holen(&id) {
            conn.senden(nachricht);
        }
    }

    // -----------------------------------------------------------------------
    // Task
    // -----------------------------------------------------------------------

    /// Ereignisschleife des Koordinators
    ///
    /// Laeuft bis `shutdown_rx` `true` meldet oder alle Handles verworfen
    /// wurden. Danach werden alle noch offenen Verbindungen geschlossen.
    pub async fn ausfuehren(
        mut self,
        mut ereignisse: mpsc::Receiver<Ereignis>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let periode = self.heartbeat.periode();
        let mut takt = tokio::time::interval_at(Instant::now() + periode, periode);
        takt.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(heartbeat_sek = periode.as_secs_f64(), "Session-Koordinator gestartet");

        loop {
            tokio::select! {
                ereignis = ereignisse.recv() => {
                    match ereignis {
                        Some(ereignis) => self.verarbeiten(ereignis),
                        None => {
                            tracing::info!("Alle Koordinator-Handles geschlossen");
                            break;
                        }
                    }
                }

                _ = takt.tick() => self.heartbeat(),

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Koordinator: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        self.alle_schliessen();
        tracing::info!("Session-Koordinator gestoppt");
    }

    /// Startet den Koordinator als eigenen tokio-Task
    pub fn starten(
        self,
        queue_groesse: usize,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_groesse);
        let task = tokio::spawn(self.ausfuehren(rx, shutdown_rx));
        (CoordinatorHandle { tx }, task)
    }
}

// ---------------------------------------------------------------------------
// CoordinatorHandle
// ---------------------------------------------------------------------------

/// Cloneable Handle auf die Ereignis-Queue des Koordinators
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Ereignis>,
}

impl CoordinatorHandle {
    async fn einreihen(&self, ereignis: Ereignis) -> SignalingResult<()> {
        self.tx
            .send(ereignis)
            .await
            .map_err(|_| SignalingError::KoordinatorBeendet)
    }

    /// Meldet eine neue Verbindung an und wartet auf die vergebene ID
    pub async fn verbinden(&self, tx: mpsc::Sender<Ausgehend>) -> SignalingResult<ConnectionId> {
        let (antwort, antwort_rx) = oneshot::channel();
        self.einreihen(Ereignis::Verbunden { tx, antwort }).await?;
        antwort_rx
            .await
            .map_err(|_| SignalingError::KoordinatorBeendet)?
    }

    pub async fn nachricht(&self, id: ConnectionId, text: String) -> SignalingResult<()> {
        self.einreihen(Ereignis::Nachricht { id, text }).await
    }

    pub async fn pong(&self, id: ConnectionId) -> SignalingResult<()> {
        self.einreihen(Ereignis::Pong { id }).await
    }

    pub async fn getrennt(&self, id: ConnectionId, grund: TrennGrund) -> SignalingResult<()> {
        self.einreihen(Ereignis::Getrennt { id, grund }).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
