//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use stammtisch_protocol::frame::STANDARD_BROADCAST_ID;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Vermittlungs-Einstellungen
    pub relay: RelayEinstellungen,
    /// Ablage-Einstellungen (Historie, Zugangsdatei)
    pub speicher: SpeicherEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
    /// Beim Handshake ein Geheimnis abfragen und gegen die Zugangsdatei pruefen
    pub passwort_erforderlich: bool,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Stammtisch Server".into(),
            max_clients: 100,
            passwort_erforderlich: false,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer TCP und UDP
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindungen (Vermittlung)
    pub tcp_port: u16,
    /// Port fuer UDP (Discovery)
    pub udp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 1234,
            udp_port: 4321,
        }
    }
}

/// Vermittlungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Leerlauf-Timeout pro Sitzung in Sekunden
    pub leerlauf_timeout_sek: u64,
    /// Groesse der Sende-Queue pro Sitzung
    pub sende_queue_groesse: usize,
    /// Reservierte Broadcast-Kennung
    pub broadcast_id: String,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            leerlauf_timeout_sek: 10,
            sende_queue_groesse: 64,
            broadcast_id: STANDARD_BROADCAST_ID.into(),
        }
    }
}

/// Ablage-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Verzeichnis fuer Historien-Dateien und die Zugangsdatei
    pub verzeichnis: String,
    /// Dateiname der Zugangsdatei (name -> SHA-256-Digest)
    pub zugangsdatei: String,
    /// Aktiviert die Nachrichten-Historie
    pub history_aktiviert: bool,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            verzeichnis: ".".into(),
            zugangsdatei: "clients_list.json".into(),
            history_aktiviert: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.udp_port)
    }

    /// Gibt den Pfad zur Zugangsdatei zurueck
    pub fn zugangsdatei_pfad(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.speicher.verzeichnis).join(&self.speicher.zugangsdatei)
    }

    /// Bildet die Vermittlungs-Konfiguration fuer den Relay-Kern
    pub fn relay_config(&self) -> stammtisch_relay::RelayConfig {
        stammtisch_relay::RelayConfig {
            max_clients: self.server.max_clients,
            leerlauf_timeout_sek: self.relay.leerlauf_timeout_sek,
            sende_queue_groesse: self.relay.sende_queue_groesse,
            broadcast_id: self.relay.broadcast_id.clone(),
            ..stammtisch_relay::RelayConfig::default()
        }
    }
}
