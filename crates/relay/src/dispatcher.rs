//! Request-Dispatcher – Lese-Schleife einer Sitzung
//!
//! Liest Frames von der Lese-Haelfte, routet `sendto` ueber die Registry
//! auf fremde Sende-Queues und mutiert die Registry bei `setname` und
//! beim Sitzungsende. Der Handshake laeuft vorab im Acceptor; die
//! Schleife startet im Zustand `Aktiv`.
//!
//! ## State Machine
//! ```text
//! (Handshake im Acceptor) -> Aktiv -> Schliessend -> Geschlossen
//! ```
//!
//! ## Fehlersemantik
//! Lesefehler und Leerlauf-Timeout werden wie ein explizites `close`
//! behandelt: austragen, Historie sichern, deaktivieren. Der Gegenseite
//! wird nichts gemeldet, die Verbindung gilt als tot. Unverstaendliche
//! Frames werden ignoriert und die Schleife liest weiter.

use futures_util::StreamExt;
use stammtisch_auth::ZugangsPruefer;
use stammtisch_core::ClientStatus;
use stammtisch_protocol::frame::ist_gueltiger_name;
use stammtisch_protocol::{ClientFrame, FrameCodec, ServerFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

use crate::session::{AusgangsNachricht, ClientSession};
use crate::state::RelayState;

/// Zustand der Sitzungs-Schleife
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsZustand {
    /// Frames werden gelesen und verarbeitet
    Aktiv,
    /// Sitzung wird abgebaut (austragen, Historie sichern)
    Schliessend,
    /// Schleife beendet, Lese-Haelfte freigegeben
    Geschlossen,
}

/// Verarbeitet die eingehenden Frames einer Sitzung
pub struct RequestDispatcher<Z>
where
    Z: ZugangsPruefer + 'static,
{
    state: Arc<RelayState<Z>>,
    session: Arc<ClientSession>,
}

impl<Z> RequestDispatcher<Z>
where
    Z: ZugangsPruefer + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<RelayState<Z>>, session: Arc<ClientSession>) -> Self {
        Self { state, session }
    }

    /// Startet die Lese-Schleife
    ///
    /// Laeuft bis `close`, Lesefehler, Leerlauf-Timeout oder bis die
    /// Sitzung anderweitig deaktiviert wurde (z.B. Schreibfehler in der
    /// Pump). Baut die Sitzung danach in jedem Fall ab.
    pub async fn verarbeiten(
        self,
        mut framed: FramedRead<OwnedReadHalf, FrameCodec>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let client_id = self.session.id();
        let leerlauf = Duration::from_secs(self.state.config.leerlauf_timeout_sek);
        let mut zustand = SitzungsZustand::Aktiv;

        tracing::trace!(client_id = %client_id, zustand = ?zustand, "Dispatcher gestartet");

        loop {
            tokio::select! {
                // Naechstes Frame, ueberwacht vom Leerlauf-Watchdog;
                // jedes empfangene Frame (auch `alive`) setzt ihn zurueck
                gelesen = tokio::time::timeout(leerlauf, framed.next()) => {
                    match gelesen {
                        Err(_) => {
                            tracing::info!(client_id = %client_id, "Leerlauf-Timeout – Verbindung gilt als tot");
                            break;
                        }
                        Ok(None) => {
                            tracing::info!(client_id = %client_id, "Verbindung vom Client getrennt");
                            break;
                        }
                        Ok(Some(Err(fehler))) => {
                            tracing::warn!(client_id = %client_id, fehler = %fehler, "Frame-Lesefehler");
                            break;
                        }
                        Ok(Some(Ok(zeile))) => {
                            match ClientFrame::parse(&zeile) {
                                Ok(frame) => {
                                    if !self.frame_verarbeiten(frame) {
                                        tracing::info!(client_id = %client_id, "Close empfangen");
                                        break;
                                    }
                                }
                                Err(fehler) => {
                                    // Robustheit vor Strenge: Muell wird verworfen
                                    tracing::debug!(client_id = %client_id, fehler = %fehler, "Frame ignoriert");
                                }
                            }
                        }
                    }
                }

                // Sitzung wurde deaktiviert (Pump-Schreibfehler oder Server-Shutdown)
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(client_id = %client_id, "Shutdown-Signal der Sitzung");
                        break;
                    }
                }
            }
        }

        zustand = SitzungsZustand::Schliessend;
        tracing::debug!(client_id = %client_id, zustand = ?zustand, "Sitzung wird abgebaut");

        self.aufraeumen().await;

        zustand = SitzungsZustand::Geschlossen;
        tracing::debug!(client_id = %client_id, zustand = ?zustand, "Dispatcher-Task beendet");
    }

    /// Verarbeitet ein einzelnes Frame im Zustand `Aktiv`
    ///
    /// Gibt `false` zurueck wenn die Sitzung enden soll (`close`).
    fn frame_verarbeiten(&self, frame: ClientFrame) -> bool {
        match frame {
            ClientFrame::SetName(neu) => self.name_wechseln(neu),
            ClientFrame::SendTo { ziele, text } => self.nachricht_routen(&ziele, &text),
            ClientFrame::SetStatus(status) => {
                self.session.status_setzen(status);
                tracing::debug!(client_id = %self.session.id(), status = %status, "Status gesetzt");
            }
            ClientFrame::GetHistory => self.historie_liefern(),
            ClientFrame::Alive => {
                tracing::trace!(client_id = %self.session.id(), "Heartbeat");
            }
            ClientFrame::Close => return false,
        }
        true
    }

    /// `setname` – Registry-Eintrag umschluesseln
    ///
    /// Bei einer Kollision bleibt der alte Name bestehen; nur der
    /// Absender bekommt einen Log-Hinweis in die eigene Queue.
    fn name_wechseln(&self, neu: String) {
        let alt = self.session.name();
        if neu == alt {
            return;
        }

        if !ist_gueltiger_name(&neu) || neu == self.state.config.broadcast_id {
            self.session.log_einreihen(format!("Invalid name ({neu})."));
            return;
        }

        match self.state.registry.umbenennen(&alt, &neu) {
            Ok(()) => {
                if let Some(history) = &self.state.history {
                    history.umbenennen(&alt, &neu);
                }
                tracing::info!(
                    client_id = %self.session.id(),
                    alt = %alt,
                    neu = %neu,
                    "Name geaendert"
                );
            }
            Err(_) => {
                self.session
                    .log_einreihen(format!("Name {neu} is already taken."));
            }
        }
    }

    /// `sendto` – Ziele aufloesen und zustellen (best-effort, at-most-once)
    fn nachricht_routen(&self, ziele: &[String], text: &str) {
        let absender_name = self.session.name();

        for ziel in ziele {
            if *ziel == self.state.config.broadcast_id {
                self.rundruf_zustellen(&absender_name, text);
            } else {
                self.direkt_zustellen(ziel, &absender_name, text);
            }
        }
    }

    /// Rundruf: eine Kopie an jede andere aktive Sitzung, nie an die eigene
    fn rundruf_zustellen(&self, absender_name: &str, text: &str) {
        let nachricht = AusgangsNachricht::neu(self.session.id(), absender_name, text, true);
        let empfaenger = self.state.registry.alle_ausser(self.session.id());

        let mut zugestellt = 0usize;
        for ziel in &empfaenger {
            if ziel.einreihen(nachricht.als_frame()) {
                zugestellt += 1;
                if let Some(history) = &self.state.history {
                    history.anhaengen(&ziel.name(), absender_name, text);
                }
            }
        }

        tracing::info!(
            client_id = %self.session.id(),
            empfaenger = empfaenger.len(),
            zugestellt = zugestellt,
            "Rundruf zugestellt"
        );
        self.session
            .log_einreihen("Message sent to everyone successfully.");
    }

    /// Direktzustellung an eine Identitaet
    fn direkt_zustellen(&self, ziel: &str, absender_name: &str, text: &str) {
        match self.state.registry.suchen(ziel) {
            None => {
                self.session
                    .log_einreihen(format!("Specified user ({ziel}) doesn't exist."));
            }
            Some(empfaenger) if empfaenger.status() == ClientStatus::Busy => {
                self.session
                    .log_einreihen(format!("Specified user ({ziel}) is busy right now."));
            }
            Some(empfaenger) => {
                let nachricht =
                    AusgangsNachricht::neu(self.session.id(), absender_name, text, false);
                if empfaenger.einreihen(nachricht.als_frame()) {
                    if let Some(history) = &self.state.history {
                        history.anhaengen(ziel, absender_name, text);
                    }
                    tracing::info!(client_id = %self.session.id(), ziel = %ziel, "Nachricht zugestellt");
                    self.session
                        .log_einreihen(format!("Message sent to {ziel} successfully."));
                }
            }
        }
    }

    /// `gethistory` – eigenen Historien-Stand liefern
    fn historie_liefern(&self) {
        match &self.state.history {
            Some(history) => {
                let json = history.als_json(&self.session.name());
                self.session.einreihen(ServerFrame::History(json));
            }
            None => {
                self.session
                    .log_einreihen("History is not available on this server.");
            }
        }
    }

    /// Baut die Sitzung ab: austragen, Historie sichern, deaktivieren
    ///
    /// Austragen und Deaktivieren sind idempotent; die Pump darf den
    /// Abbau bereits angestossen haben.
    async fn aufraeumen(&self) {
        let name = self.session.name();
        self.state.registry.abmelden(&name);

        if let Some(history) = &self.state.history {
            if let Err(fehler) = history.speichern(&name).await {
                tracing::warn!(name = %name, fehler = %fehler, "Historie konnte nicht gespeichert werden");
            }
        }

        self.session.deaktivieren();
        tracing::info!(client_id = %self.session.id(), name = %name, "Sitzung beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
