//! Fehlertypen fuer Stammtisch
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Stammtisch
pub type Result<T> = std::result::Result<T, StammtischError>;

/// Alle moeglichen Fehler im Stammtisch-System
#[derive(Debug, Error)]
pub enum StammtischError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Vermittlung ---
    #[error("Name bereits vergeben: {0}")]
    NameKonflikt(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Server voll: maximale Clientanzahl erreicht")]
    ServerVoll,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StammtischError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Sitzung beendet
    ///
    /// Routing-Fehler (unbekannter oder beschaeftigter Empfaenger) werden
    /// per Log-Frame an den Absender gemeldet und sind nie fatal.
    pub fn ist_fatal_fuer_sitzung(&self) -> bool {
        matches!(
            self,
            Self::Verbindung(_) | Self::Getrennt(_) | Self::Zeitlimit(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = StammtischError::NameKonflikt("heinz".into());
        assert_eq!(e.to_string(), "Name bereits vergeben: heinz");
    }

    #[test]
    fn fatal_erkennung() {
        assert!(StammtischError::Zeitlimit("test".into()).ist_fatal_fuer_sitzung());
        assert!(!StammtischError::BenutzerNichtGefunden("test".into()).ist_fatal_fuer_sitzung());
        assert!(!StammtischError::ServerVoll.ist_fatal_fuer_sitzung());
    }
}
