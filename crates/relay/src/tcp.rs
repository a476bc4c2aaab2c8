//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen, Handshake
//!
//! Der `RelayServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task. Dort laeuft erst der
//! Handshake (`?name`, optional `?pass`, Kapazitaetspruefung); nach der
//! Zulassung werden Dispatcher- und Pump-Task der Sitzung gespawnt und
//! gemeinsam abgewartet.
//!
//! ## Handshake
//! ```text
//! S: ?name          C: <name>
//! S: ?pass          C: <geheimnis>     (nur wenn der Pruefer es verlangt)
//! S: accept | reject | "Server is full! try again later."
//! S: setid:<id>                        (nur nach accept)
//! ```

use futures_util::{SinkExt, StreamExt};
use stammtisch_auth::ZugangsPruefer;
use stammtisch_protocol::frame::{
    ist_gueltiger_name, HANDSHAKE_ACCEPT, HANDSHAKE_NAME, HANDSHAKE_PASS, HANDSHAKE_REJECT,
    SERVER_VOLL_TEXT,
};
use stammtisch_protocol::{FrameCodec, ServerFrame};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::dispatcher::RequestDispatcher;
use crate::error::RelayError;
use crate::pump::DeliveryPump;
use crate::session::{ClientSession, SessionKanaele};
use crate::state::RelayState;

/// TCP-Relay-Server
///
/// Bindet einen TCP-Socket und akzeptiert Verbindungen in einer Loop.
/// Kein Verbindungsfehler beendet die Accept-Loop.
pub struct RelayServer<Z>
where
    Z: ZugangsPruefer + 'static,
{
    state: Arc<RelayState<Z>>,
    listener: TcpListener,
}

impl<Z> RelayServer<Z>
where
    Z: ZugangsPruefer + 'static,
{
    /// Bindet den TCP-Socket und erstellt einen neuen RelayServer
    pub async fn binden(state: Arc<RelayState<Z>>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!(adresse = %listener.local_addr()?, "TCP Relay-Server gebunden");
        Ok(Self { state, listener })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let state = Arc::clone(&self.state);
                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung_verarbeiten(state, stream, peer_addr, shutdown_rx_clone)
                                    .await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Relay-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Relay-Server gestoppt");
        Ok(())
    }
}

/// Verarbeitet eine einzelne Verbindung: Handshake, dann Sitzungs-Tasks
async fn verbindung_verarbeiten<Z>(
    state: Arc<RelayState<Z>>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    server_shutdown: watch::Receiver<bool>,
) where
    Z: ZugangsPruefer + 'static,
{
    tracing::info!(peer = %peer_addr, "Neue Verbindung");

    let codec = FrameCodec::with_max_size(state.config.max_frame_groesse);
    let (lese, schreib) = stream.into_split();
    let mut leser = FramedRead::new(lese, codec.clone());
    let mut schreiber = FramedWrite::new(schreib, codec);

    let (session, kanaele) = match handshake(&state, &mut leser, &mut schreiber, peer_addr).await {
        Ok(Some(zugelassen)) => zugelassen,
        Ok(None) => {
            // Abgelehnt – Antwort ist bereits raus, Drop schliesst den Socket
            return;
        }
        Err(fehler) => {
            tracing::debug!(peer = %peer_addr, fehler = %fehler, "Handshake abgebrochen");
            return;
        }
    };

    // Server-Shutdown auf die Sitzung durchreichen
    {
        let session = Arc::clone(&session);
        let mut server_shutdown = server_shutdown;
        tokio::spawn(async move {
            while server_shutdown.changed().await.is_ok() {
                if *server_shutdown.borrow() {
                    session.deaktivieren();
                    break;
                }
            }
        });
    }

    let dispatcher = RequestDispatcher::neu(Arc::clone(&state), Arc::clone(&session));
    let pump = DeliveryPump::neu(Arc::clone(&session));

    let lese_task = tokio::spawn(dispatcher.verarbeiten(leser, session.shutdown_abonnieren()));
    let schreib_task = tokio::spawn(pump.verarbeiten(schreiber, kanaele.sende_rx, kanaele.shutdown_rx));

    // Beide Sitzungs-Tasks gemeinsam abwarten – kein fire-and-forget
    let _ = tokio::join!(lese_task, schreib_task);
    tracing::info!(peer = %peer_addr, "Verbindungs-Tasks beendet");
}

/// Fuehrt den Zulassungs-Handshake durch
///
/// `Ok(Some(..))` bei Zulassung, `Ok(None)` bei beantworteter Ablehnung,
/// `Err` wenn die Gegenseite vorzeitig trennt.
async fn handshake<Z>(
    state: &Arc<RelayState<Z>>,
    leser: &mut FramedRead<OwnedReadHalf, FrameCodec>,
    schreiber: &mut FramedWrite<OwnedWriteHalf, FrameCodec>,
    peer_addr: SocketAddr,
) -> Result<Option<(Arc<ClientSession>, SessionKanaele)>, std::io::Error>
where
    Z: ZugangsPruefer + 'static,
{
    // Identitaet anfordern
    schreiber.send(HANDSHAKE_NAME.to_string()).await?;
    let name = naechste_zeile(leser).await?;

    if !ist_gueltiger_name(&name) || name == state.config.broadcast_id {
        tracing::info!(peer = %peer_addr, name = %name, "Zulassung verweigert: ungueltiger Name");
        schreiber.send(HANDSHAKE_REJECT.to_string()).await?;
        return Ok(None);
    }

    // Geheimnis nur abfragen wenn die Strategie es verlangt
    if state.zugang.erfordert_geheimnis() {
        schreiber.send(HANDSHAKE_PASS.to_string()).await?;
        let geheimnis = naechste_zeile(leser).await?;

        if !state.zugang.pruefen(&name, &geheimnis) {
            tracing::info!(peer = %peer_addr, name = %name, "Zulassung verweigert");
            schreiber.send(HANDSHAKE_REJECT.to_string()).await?;
            return Ok(None);
        }
    }

    // Kapazitaet und Eintragung atomar unter der Registry-Sperre
    let id = state.registry.naechste_client_id();
    let (session, kanaele) = ClientSession::neu(id, name.clone(), state.config.sende_queue_groesse);

    match state
        .registry
        .registrieren_mit_limit(Arc::clone(&session), state.config.max_clients as usize)
    {
        Ok(()) => {}
        Err(RelayError::ServerVoll) => {
            tracing::warn!(
                peer = %peer_addr,
                max = state.config.max_clients,
                "Server voll – Verbindung abgelehnt"
            );
            schreiber.send(SERVER_VOLL_TEXT.to_string()).await?;
            return Ok(None);
        }
        Err(_) => {
            tracing::info!(peer = %peer_addr, name = %name, "Zulassung verweigert: Name aktiv in Benutzung");
            schreiber.send(HANDSHAKE_REJECT.to_string()).await?;
            return Ok(None);
        }
    }

    schreiber.send(HANDSHAKE_ACCEPT.to_string()).await?;
    schreiber.send(ServerFrame::SetId(id)).await?;

    // Historie opportunistisch laden; Fehler blockieren die Zulassung nicht
    if let Some(history) = &state.history {
        if let Err(fehler) = history.laden(&name).await {
            tracing::warn!(name = %name, fehler = %fehler, "Historie konnte nicht geladen werden");
        }
    }

    tracing::info!(peer = %peer_addr, client_id = %id, name = %name, "Client zugelassen");
    Ok(Some((session, kanaele)))
}

/// Liest das naechste Frame oder meldet eine getrennte Verbindung
async fn naechste_zeile(
    leser: &mut FramedRead<OwnedReadHalf, FrameCodec>,
) -> Result<String, std::io::Error> {
    match leser.next().await {
        Some(Ok(zeile)) => Ok(zeile),
        Some(Err(e)) => Err(e),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "Verbindung waehrend des Handshakes getrennt",
        )),
    }
}
