//! stammtisch-relay – Vermittlungskern des Chat-Relays
//!
//! Dieser Crate implementiert den nebenlaeufigen Kern: Verbindungen
//! annehmen, Identitaeten verwalten, Nachrichten zwischen Sitzungen
//! routen und UDP-Anfragen nach der Benutzerliste beantworten.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! Handshake (?name / ?pass / Kapazitaet) ---> Registry.registrieren
//!     |
//!     +-- RequestDispatcher (Lese-Task)   Frames lesen, routen, Registry mutieren
//!     +-- DeliveryPump      (Schreib-Task) Sende-Queue der Sitzung entleeren
//!
//! ClientRegistry   – Identitaet -> ClientSession, eine Tabelle, eine Sperre
//! DiscoveryServer  – UDP "getactiveusers" -> "ID:<id>,NAME:<name>;..."
//! ```
//!
//! Pro Sitzung laufen genau zwei Tasks, die sich die `ClientSession`
//! teilen. `deaktivieren` ist das einzige Abbruch-Primitiv und stoppt
//! beide Tasks ueber den sitzungsinternen Shutdown-Kanal.

pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod pump;
pub mod registry;
pub mod session;
pub mod state;
pub mod tcp;

// Bequeme Re-Exporte
pub use discovery::DiscoveryServer;
pub use dispatcher::RequestDispatcher;
pub use error::{RelayError, RelayResult};
pub use pump::DeliveryPump;
pub use registry::ClientRegistry;
pub use session::{AusgangsNachricht, ClientSession, SessionKanaele};
pub use state::{RelayConfig, RelayState};
pub use tcp::RelayServer;
