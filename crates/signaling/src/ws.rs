//! WebSocket-Listener – Nimmt Upgrades an
//!
//! Der `SignalingServer` bedient auf einem gebundenen Listener den WebSocket-Pfad
//! per axum und startet fuer jede Verbindung einen eigenen Task mit einer
//! `ClientConnection`. Das Client-Limit prueft der Koordinator bei der
//! Registrierung.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// WebSocket-Signaling-Server
///
/// Der Listener wird vom Aufrufer gebunden, damit Bind-Fehler vor dem Start
/// der Tasks auffallen.
pub struct SignalingServer {
    state: SignalingState,
    listener: TcpListener,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer auf einem gebundenen Listener
    pub fn neu(state: SignalingState, listener: TcpListener) -> Self {
        Self { state, listener }
    }

    /// Baut den axum-Router fuer den WebSocket-Pfad
    pub fn router(state: SignalingState) -> Router {
        let pfad = state.config.ws_pfad.clone();
        Router::new()
            .route(&pfad, get(ws_upgrade_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bedient Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let lokale_addr = self.listener.local_addr()?;
        let pfad = self.state.config.ws_pfad.clone();
        let app = Self::router(self.state);

        tracing::info!(adresse = %lokale_addr, pfad = %pfad, "WebSocket Signaling-Server gestartet");

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
        })
        .await?;

        tracing::info!("WebSocket Signaling-Server gestoppt");
        Ok(())
    }
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<SignalingState>,
) -> impl IntoResponse {
    tracing::debug!(peer = %peer_addr, "WebSocket-Upgrade angefragt");
    ws.on_upgrade(move |socket| ClientConnection::neu(state, peer_addr).verarbeiten(socket))
}
