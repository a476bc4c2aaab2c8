//! Client-Sitzung – Zustand einer einzelnen Verbindung
//!
//! Eine `ClientSession` wird vom Acceptor nach erfolgreichem Handshake
//! erzeugt und von genau zwei Tasks geteilt: dem Dispatcher (liest) und
//! der Pump (schreibt). Die Sende-Queue ist die einzige Uebergabestelle
//! zwischen fremden Dispatchern und der eigenen Pump; pro Queue gilt
//! FIFO-Reihenfolge.
//!
//! `deaktivieren` ist idempotent und der einzige autoritative Uebergang
//! der beide Tasks stoppt.

use parking_lot::Mutex;
use stammtisch_core::{ClientId, ClientStatus};
use stammtisch_protocol::ServerFrame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

// ---------------------------------------------------------------------------
// AusgangsNachricht
// ---------------------------------------------------------------------------

/// Eine vom Dispatcher erzeugte, zustellfertige Nachricht
///
/// Wird einmal pro `sendto` gebaut und danach nie mehr veraendert; pro
/// Empfaenger-Queue landet eine gerenderte Kopie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AusgangsNachricht {
    /// Verbindungs-ID des Absenders
    pub absender_id: ClientId,
    /// Identitaet des Absenders zum Zeitpunkt des Sendens
    pub absender_name: String,
    /// Nachrichtentext (darf Zeilenumbrueche enthalten)
    pub text: String,
    /// true wenn die Nachricht an die Broadcast-Kennung ging
    pub rundruf: bool,
}

impl AusgangsNachricht {
    /// Erstellt eine neue AusgangsNachricht
    pub fn neu(
        absender_id: ClientId,
        absender_name: impl Into<String>,
        text: impl Into<String>,
        rundruf: bool,
    ) -> Self {
        Self {
            absender_id,
            absender_name: absender_name.into(),
            text: text.into(),
            rundruf,
        }
    }

    /// Rendert die Nachricht als `msgfrom`-Frame
    pub fn als_frame(&self) -> ServerFrame {
        ServerFrame::MsgFrom {
            absender_id: self.absender_id,
            absender_name: self.absender_name.clone(),
            text: self.text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// Empfangsseite der Sitzungs-Kanaele
///
/// Geht beim Spawnen an die Pump; die `ClientSession` selbst behaelt nur
/// die Sende-Seiten.
pub struct SessionKanaele {
    /// Sende-Queue der Sitzung (FIFO, von der Pump entleert)
    pub sende_rx: mpsc::Receiver<ServerFrame>,
    /// Sitzungsinterner Shutdown-Kanal
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Zustand einer verbundenen Client-Sitzung
///
/// Die rohen Socket-Haelften gehoeren exklusiv den beiden Sitzungs-Tasks;
/// kein anderer Bestandteil fasst den Socket direkt an.
pub struct ClientSession {
    id: ClientId,
    name: Mutex<String>,
    status: Mutex<ClientStatus>,
    aktiv: AtomicBool,
    sende_tx: mpsc::Sender<ServerFrame>,
    shutdown_tx: watch::Sender<bool>,
}

impl ClientSession {
    /// Erstellt eine neue Sitzung samt Empfangsseite ihrer Kanaele
    pub fn neu(
        id: ClientId,
        name: impl Into<String>,
        queue_groesse: usize,
    ) -> (Arc<Self>, SessionKanaele) {
        let (sende_tx, sende_rx) = mpsc::channel(queue_groesse);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Arc::new(Self {
            id,
            name: Mutex::new(name.into()),
            status: Mutex::new(ClientStatus::Available),
            aktiv: AtomicBool::new(true),
            sende_tx,
            shutdown_tx,
        });

        (
            session,
            SessionKanaele {
                sende_rx,
                shutdown_rx,
            },
        )
    }

    /// Gibt die verbindungsgebundene Client-ID zurueck
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Gibt die aktuelle Identitaet zurueck
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Setzt die Identitaet (nur durch die Registry beim Umbenennen)
    pub(crate) fn name_setzen(&self, neu: impl Into<String>) {
        *self.name.lock() = neu.into();
    }

    /// Gibt die aktuelle Erreichbarkeit zurueck
    pub fn status(&self) -> ClientStatus {
        *self.status.lock()
    }

    /// Setzt die Erreichbarkeit
    pub fn status_setzen(&self, status: ClientStatus) {
        *self.status.lock() = status;
    }

    /// Gibt true zurueck solange die Sitzung lebt
    pub fn ist_aktiv(&self) -> bool {
        self.aktiv.load(Ordering::SeqCst)
    }

    /// Abonniert den sitzungsinternen Shutdown-Kanal
    pub fn shutdown_abonnieren(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Reiht ein Frame nicht-blockierend in die Sende-Queue ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist; die
    /// Zustellung ist best-effort und wird dann verworfen.
    pub fn einreihen(&self, frame: ServerFrame) -> bool {
        match self.sende_tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.id, "Sende-Queue voll – Frame verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %self.id, "Sende-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }

    /// Reiht einen `log:`-Hinweis in die eigene Sende-Queue ein
    pub fn log_einreihen(&self, text: impl Into<String>) -> bool {
        self.einreihen(ServerFrame::Log(text.into()))
    }

    /// Markiert die Sitzung als beendet und stoppt beide Tasks
    ///
    /// Idempotent und von Dispatcher und Pump gleichzeitig aufrufbar;
    /// nur der erste Aufruf loest den Shutdown-Kanal aus.
    pub fn deaktivieren(&self) {
        if self.aktiv.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(true);
            tracing::debug!(client_id = %self.id, "Sitzung deaktiviert");
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("status", &self.status())
            .field("aktiv", &self.ist_aktiv())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
