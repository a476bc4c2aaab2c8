//! Fehlertypen fuer die Historien-Ablage

use thiserror::Error;

/// Fehlertyp fuer die Historien-Ablage
#[derive(Debug, Error)]
pub enum HistoryFehler {
    /// IO-Fehler beim Lesen oder Schreiben einer Historien-Datei
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Historien-Datei enthaelt kein gueltiges JSON
    #[error("Historien-Datei fehlerhaft: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

/// Result-Typ fuer die Historien-Ablage
pub type HistoryResult<T> = Result<T, HistoryFehler>;
