//! stammtisch-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und setzt die Subsysteme zusammen.

pub mod config;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use config::ServerConfig;
use stammtisch_auth::{DateiZugang, OffenerZugang, ZugangsPruefer};
use stammtisch_history::HistoryStore;
use stammtisch_relay::{DiscoveryServer, RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Zulassungsstrategie waehlen (offen oder Zugangsdatei)
    /// 2. TCP-Listener binden (Vermittlung)
    /// 3. UDP-Socket binden (Discovery)
    /// 4. Auf Ctrl-C warten, Tasks einsammeln
    /// 5. Zugangsdatei sichern (Selbstregistrierungen)
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            udp = %self.config.udp_bind_adresse(),
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        if self.config.server.passwort_erforderlich {
            let pfad = self.config.zugangsdatei_pfad();
            let zugang = Arc::new(
                DateiZugang::laden(&pfad)
                    .await
                    .context("Zugangsdatei laden")?,
            );

            self.betreiben(Arc::clone(&zugang)).await?;

            // Beim Erstkontakt eingetragene Namen ueberleben den Neustart
            zugang
                .speichern()
                .await
                .context("Zugangsdatei speichern")?;
            Ok(())
        } else {
            self.betreiben(Arc::new(OffenerZugang)).await
        }
    }

    async fn betreiben<Z>(&self, zugang: Arc<Z>) -> Result<()>
    where
        Z: ZugangsPruefer + 'static,
    {
        let history = if self.config.speicher.history_aktiviert {
            Some(Arc::new(HistoryStore::neu(&self.config.speicher.verzeichnis)))
        } else {
            None
        };

        let state = RelayState::neu(self.config.relay_config(), zugang, history);

        let tcp_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .context("Ungueltige TCP-Bind-Adresse")?;
        let udp_addr: SocketAddr = self
            .config
            .udp_bind_adresse()
            .parse()
            .context("Ungueltige UDP-Bind-Adresse")?;

        let relay = RelayServer::binden(Arc::clone(&state), tcp_addr).await?;
        let discovery = DiscoveryServer::binden(udp_addr, state.registry.clone()).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay_task = tokio::spawn(relay.starten(shutdown_rx.clone()));
        let discovery_task = tokio::spawn(discovery.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);

        // Beaufsichtigte Tasks einsammeln statt fire-and-forget
        let (relay_ende, discovery_ende) = tokio::join!(relay_task, discovery_task);
        relay_ende.context("Relay-Task abgebrochen")??;
        discovery_ende.context("Discovery-Task abgebrochen")??;

        Ok(())
    }
}
