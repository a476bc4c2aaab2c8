//! stammtisch-history – Nachrichten-Historie pro Identitaet
//!
//! Der Dispatcher haengt jede zugestellte Nachricht opportunistisch an die
//! Historie des Empfaengers an; `gethistory` liefert den eigenen Stand als
//! JSON zurueck. Die Ablage ist eine Datei `<name>_hist.json` pro
//! Identitaet, geladen bei der Zulassung und geschrieben am Sitzungsende.
//! Korrektheit des Relays haengt nicht an dieser Komponente.

pub mod error;
pub mod store;

// Bequeme Re-Exporte
pub use error::{HistoryFehler, HistoryResult};
pub use store::HistoryStore;
