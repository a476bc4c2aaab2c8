//! Frame-Typen und Text-Kodierung
//!
//! Ein Frame ist ein dekodiertes Protokoll-Kommando. Client- und
//! Server-Richtung haben getrennte Enums: der Server parst nur
//! `ClientFrame`, der Client nur `ServerFrame`.
//!
//! Nicht erkennbare Kommandos ergeben [`FrameFehler::Unbekannt`]. Der
//! Dispatcher behandelt das als No-Op (ignorieren und weiterlesen),
//! nicht als fatalen Fehler.

use stammtisch_core::{ClientId, ClientStatus};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Protokoll-Konstanten
// ---------------------------------------------------------------------------

/// Handshake: Server fordert den Namen an
pub const HANDSHAKE_NAME: &str = "?name";

/// Handshake: Server fordert das Geheimnis an
pub const HANDSHAKE_PASS: &str = "?pass";

/// Handshake: Zulassung bestaetigt
pub const HANDSHAKE_ACCEPT: &str = "accept";

/// Handshake: Zulassung verweigert
pub const HANDSHAKE_REJECT: &str = "reject";

/// Klartext-Abweisung bei erschoepfter Kapazitaet
pub const SERVER_VOLL_TEXT: &str = "Server is full! try again later.";

/// UDP-Anfragetoken fuer die Liste aktiver Benutzer
pub const DISCOVERY_ANFRAGE: &str = "getactiveusers";

/// Reservierte Broadcast-Kennung (Client-IDs beginnen bei 1)
pub const STANDARD_BROADCAST_ID: &str = "0";

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Dekodierfehler auf Frame-Ebene
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameFehler {
    /// Kein bekanntes Verb-Praefix bzw. fehlerhafte Felder
    #[error("Unbekanntes oder fehlerhaftes Frame: {0:?}")]
    Unbekannt(String),
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Kommandos die ein Client an den Server sendet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// `setname:<name>` – Identitaet beanspruchen oder wechseln
    SetName(String),
    /// `sendto:<ziel[,ziel...]> msg:<text>` – Nachricht zustellen
    SendTo { ziele: Vec<String>, text: String },
    /// `setstatus:<Available|Busy>` – Erreichbarkeit setzen
    SetStatus(ClientStatus),
    /// `gethistory` – eigene Nachrichten-Historie anfordern
    GetHistory,
    /// `alive` – Heartbeat, setzt den Leerlauf-Watchdog zurueck
    Alive,
    /// `close` – Verbindung sauber beenden
    Close,
}

impl ClientFrame {
    /// Parst ein Text-Kommando
    ///
    /// Ziele in `sendto` duerfen keine Leerzeichen enthalten, daher ist
    /// die Trennung am ersten ` msg:` eindeutig. Der Nachrichtentext
    /// selbst darf Zeilenumbrueche enthalten.
    pub fn parse(zeile: &str) -> Result<Self, FrameFehler> {
        match zeile {
            "alive" => return Ok(Self::Alive),
            "close" => return Ok(Self::Close),
            "gethistory" => return Ok(Self::GetHistory),
            _ => {}
        }

        if let Some(name) = zeile.strip_prefix("setname:") {
            if name.is_empty() || name.contains('\n') {
                return Err(FrameFehler::Unbekannt(zeile.into()));
            }
            return Ok(Self::SetName(name.to_string()));
        }

        if let Some(status) = zeile.strip_prefix("setstatus:") {
            return status
                .parse::<ClientStatus>()
                .map(Self::SetStatus)
                .map_err(|_| FrameFehler::Unbekannt(zeile.into()));
        }

        if let Some(rest) = zeile.strip_prefix("sendto:") {
            let (ziele_roh, text) = rest
                .split_once(" msg:")
                .ok_or_else(|| FrameFehler::Unbekannt(zeile.into()))?;
            if ziele_roh.is_empty() || ziele_roh.contains(char::is_whitespace) {
                return Err(FrameFehler::Unbekannt(zeile.into()));
            }
            let ziele: Vec<String> = ziele_roh.split(',').map(str::to_string).collect();
            if ziele.iter().any(|z| z.is_empty()) {
                return Err(FrameFehler::Unbekannt(zeile.into()));
            }
            return Ok(Self::SendTo {
                ziele,
                text: text.to_string(),
            });
        }

        Err(FrameFehler::Unbekannt(zeile.into()))
    }

    /// Erzeugt die Text-Darstellung des Kommandos
    pub fn to_wire(&self) -> String {
        match self {
            Self::SetName(name) => format!("setname:{name}"),
            Self::SendTo { ziele, text } => {
                format!("sendto:{} msg:{}", ziele.join(","), text)
            }
            Self::SetStatus(status) => format!("setstatus:{status}"),
            Self::GetHistory => "gethistory".into(),
            Self::Alive => "alive".into(),
            Self::Close => "close".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Frames die der Server an einen Client sendet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// `log:<text>` – Server-Hinweis
    Log(String),
    /// `msgfrom:<id> name:<name> msg:<text>` – zugestellte Nachricht
    MsgFrom {
        absender_id: ClientId,
        absender_name: String,
        text: String,
    },
    /// `setid:<id>` – verbindungsgebundene ID nach der Zulassung
    SetId(ClientId),
    /// `history:<json>` – Historien-Abzug als JSON
    History(String),
}

impl ServerFrame {
    /// Parst ein Server-Frame (Client-Seite und Tests)
    pub fn parse(zeile: &str) -> Result<Self, FrameFehler> {
        if let Some(text) = zeile.strip_prefix("log:") {
            return Ok(Self::Log(text.to_string()));
        }

        if let Some(json) = zeile.strip_prefix("history:") {
            return Ok(Self::History(json.to_string()));
        }

        if let Some(id) = zeile.strip_prefix("setid:") {
            return id
                .parse::<u64>()
                .map(|n| Self::SetId(ClientId(n)))
                .map_err(|_| FrameFehler::Unbekannt(zeile.into()));
        }

        if let Some(rest) = zeile.strip_prefix("msgfrom:") {
            let (id_roh, rest) = rest
                .split_once(" name:")
                .ok_or_else(|| FrameFehler::Unbekannt(zeile.into()))?;
            let (name, text) = rest
                .split_once(" msg:")
                .ok_or_else(|| FrameFehler::Unbekannt(zeile.into()))?;
            let id = id_roh
                .parse::<u64>()
                .map_err(|_| FrameFehler::Unbekannt(zeile.into()))?;
            return Ok(Self::MsgFrom {
                absender_id: ClientId(id),
                absender_name: name.to_string(),
                text: text.to_string(),
            });
        }

        Err(FrameFehler::Unbekannt(zeile.into()))
    }

    /// Erzeugt die Text-Darstellung des Frames
    pub fn to_wire(&self) -> String {
        match self {
            Self::Log(text) => format!("log:{text}"),
            Self::MsgFrom {
                absender_id,
                absender_name,
                text,
            } => format!("msgfrom:{absender_id} name:{absender_name} msg:{text}"),
            Self::SetId(id) => format!("setid:{id}"),
            Self::History(json) => format!("history:{json}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Namensregel
// ---------------------------------------------------------------------------

/// Prueft ob ein Name zulaessig ist
///
/// Erlaubt sind Buchstaben, Ziffern, `-`, `_` und `.`. Kommas und
/// Leerzeichen sind damit ausgeschlossen, sodass Namen in `sendto`-
/// Ziellisten eindeutig trennbar bleiben und als Dateinamen der
/// Historien-Ablage taugen.
pub fn ist_gueltiger_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
