//! Fehlertypen fuer den Vermittlungskern

use thiserror::Error;

/// Fehlertyp fuer den Vermittlungskern
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO-Fehler (TCP, UDP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Leerlauf-Timeout (kein Frame, kein Heartbeat)
    #[error("Zeitlimit ueberschritten")]
    Zeitlimit,

    /// Identitaet ist bereits aktiv vergeben
    #[error("Name bereits vergeben: {0}")]
    NameKonflikt(String),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// Senden an eine Sitzung fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl RelayError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer den Vermittlungskern
pub type RelayResult<T> = Result<T, RelayError>;
