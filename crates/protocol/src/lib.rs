//! stammtisch-protocol – Wire-Protokoll des Chat-Relays
//!
//! Das Protokoll ist textbasiert: jedes Frame traegt genau ein Kommando
//! der Form `verb:payload` bzw. `verb:feld1 feld2:feld3`. Der letzte
//! `msg:`-Wert darf eingebettete Zeilenumbrueche enthalten.
//!
//! ## Schichten
//!
//! ```text
//! TCP-Bytestrom
//!     |
//!     v
//! wire::FrameCodec        <- Laengen-Prefix (u32 BE) + Text-Payload
//!     |
//!     v
//! frame::ClientFrame      <- verb:payload parsen (Server-Eingang)
//! frame::ServerFrame      <- verb:payload erzeugen (Server-Ausgang)
//! ```

pub mod frame;
pub mod wire;

// Bequeme Re-Exporte
pub use frame::{ClientFrame, FrameFehler, ServerFrame};
pub use wire::FrameCodec;
