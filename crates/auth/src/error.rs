//! Fehlertypen fuer die Zulassungspruefung

use thiserror::Error;

/// Fehlertyp fuer die Zulassungspruefung
#[derive(Debug, Error)]
pub enum AuthFehler {
    /// IO-Fehler beim Lesen oder Schreiben der Zugangsdatei
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Zugangsdatei enthaelt kein gueltiges JSON
    #[error("Zugangsdatei fehlerhaft: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

/// Result-Typ fuer die Zulassungspruefung
pub type AuthResult<T> = Result<T, AuthFehler>;
