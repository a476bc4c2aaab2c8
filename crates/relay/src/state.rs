//! Gemeinsamer Zustand des Vermittlungskerns
//!
//! Haelt Registry, Zulassungspruefung und (optional) den Historien-Store
//! als Arc-Referenzen, die sicher zwischen tokio-Tasks geteilt werden.

use stammtisch_auth::ZugangsPruefer;
use stammtisch_history::HistoryStore;
use stammtisch_protocol::frame::STANDARD_BROADCAST_ID;
use stammtisch_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::Arc;

use crate::registry::ClientRegistry;

/// Konfiguration fuer den Vermittlungskern
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
    /// Leerlauf-Timeout pro Sitzung in Sekunden (Frame oder `alive` setzt zurueck)
    pub leerlauf_timeout_sek: u64,
    /// Groesse der Sende-Queue pro Sitzung
    pub sende_queue_groesse: usize,
    /// Reservierte Broadcast-Kennung in `sendto`-Ziellisten
    pub broadcast_id: String,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_clients: 100,
            leerlauf_timeout_sek: 10,
            sende_queue_groesse: 64,
            broadcast_id: STANDARD_BROADCAST_ID.to_string(),
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Zustand (thread-safe, Arc-geteilt)
///
/// Generisch ueber die Zulassungsstrategie: ein Server ohne Passwort
/// verwendet `OffenerZugang`, einer mit Zugangsdatei `DateiZugang`.
/// Der Historien-Store ist optional; ohne ihn beantwortet der Dispatcher
/// `gethistory` mit einem Log-Hinweis.
pub struct RelayState<Z>
where
    Z: ZugangsPruefer + 'static,
{
    /// Vermittlungs-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Identitaet -> Sitzung
    pub registry: ClientRegistry,
    /// Zulassungspruefung beim Handshake
    pub zugang: Arc<Z>,
    /// Historien-Store (optional)
    pub history: Option<Arc<HistoryStore>>,
}

impl<Z> RelayState<Z>
where
    Z: ZugangsPruefer + 'static,
{
    /// Erstellt einen neuen RelayState
    pub fn neu(
        config: RelayConfig,
        zugang: Arc<Z>,
        history: Option<Arc<HistoryStore>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            registry: ClientRegistry::neu(),
            zugang,
            history,
        })
    }
}
