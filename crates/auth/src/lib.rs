//! stammtisch-auth – Zulassungspruefung beim Verbindungs-Handshake
//!
//! Der Acceptor fragt beim Handshake optional ein Geheimnis ab und laesst
//! die Entscheidung von einem austauschbaren [`ZugangsPruefer`] treffen.
//! Mitgeliefert sind zwei Strategien:
//! - [`OffenerZugang`] – kein Geheimnis, jeder Name wird zugelassen
//! - [`DateiZugang`] – SHA-256-Digests in einer JSON-Datei; bekannte Namen
//!   werden verifiziert, unbekannte beim ersten Kontakt eingetragen

pub mod datei_zugang;
pub mod error;
pub mod passwort;
pub mod pruefer;

// Bequeme Re-Exporte
pub use datei_zugang::DateiZugang;
pub use error::{AuthFehler, AuthResult};
pub use pruefer::{OffenerZugang, ZugangsPruefer};
