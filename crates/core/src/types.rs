//! Gemeinsame Identifikations- und Statustypen fuer Stammtisch
//!
//! Die Client-ID verwendet das Newtype-Pattern um Verwechslungen mit
//! anderen Zahlwerten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Verbindungsgebundene Client-ID
///
/// Wird vom Acceptor fortlaufend vergeben. Die ID 0 ist als
/// Broadcast-Kennung reserviert und wird nie an einen Client vergeben.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Gibt den inneren Zahlwert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Erreichbarkeit eines verbundenen Clients
///
/// `Busy`-Clients bekommen keine Direktnachrichten zugestellt; der
/// Absender erhaelt stattdessen einen Log-Hinweis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Available,
    Busy,
}

impl ClientStatus {
    /// Gibt die Protokoll-Schreibweise zurueck ("Available" / "Busy")
    pub fn als_text(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Busy => "Busy",
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_text())
    }
}

impl FromStr for ClientStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Busy" => Ok(Self::Busy),
            _ => Err(()),
        }
    }
}
