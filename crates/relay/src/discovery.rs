//! UDP Discovery-Responder – Wer ist gerade aktiv?
//!
//! Bindet einen UDP-Socket und beantwortet das Anfragetoken
//! `getactiveusers` mit der Momentaufnahme der Registry:
//! `ID:<id>,NAME:<name>;` pro aktiver Sitzung, Semikolon-terminiert.
//! Zustandslos und best-effort: eine verlorene Antwort ist das Problem
//! des Anfragenden, kein Fehler beendet die Empfangs-Loop.

use stammtisch_protocol::frame::DISCOVERY_ANFRAGE;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::registry::ClientRegistry;

/// Maximale Groesse eines Anfrage-Datagramms
const UDP_PUFFER_GROESSE: usize = 1024;

/// UDP-Responder fuer die Liste aktiver Benutzer
pub struct DiscoveryServer {
    socket: UdpSocket,
    registry: ClientRegistry,
}

impl DiscoveryServer {
    /// Bindet den UDP-Socket und erstellt einen neuen DiscoveryServer
    pub async fn binden(bind_addr: SocketAddr, registry: ClientRegistry) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(adresse = %socket.local_addr()?, "UDP Discovery-Responder gebunden");
        Ok(Self { socket, registry })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Beantwortet Anfragen bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let mut puffer = [0u8; UDP_PUFFER_GROESSE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut puffer) => {
                    match result {
                        Ok((laenge, absender)) => {
                            let anfrage = String::from_utf8_lossy(&puffer[..laenge]);
                            if anfrage == DISCOVERY_ANFRAGE {
                                let antwort = aktive_benutzer_antwort(&self.registry);
                                tracing::debug!(
                                    absender = %absender,
                                    bytes = antwort.len(),
                                    "Benutzerliste angefragt"
                                );
                                if let Err(e) = self.socket.send_to(antwort.as_bytes(), absender).await {
                                    tracing::warn!(absender = %absender, fehler = %e, "UDP-Sendefehler");
                                }
                            } else {
                                tracing::trace!(absender = %absender, "Unbekanntes UDP-Token ignoriert");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(fehler = %e, "UDP-Empfangsfehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Discovery-Responder: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("UDP Discovery-Responder gestoppt");
        Ok(())
    }
}

/// Serialisiert die Momentaufnahme der Registry als Antwort-Datagramm
pub fn aktive_benutzer_antwort(registry: &ClientRegistry) -> String {
    let mut antwort = String::new();
    for (id, name, _status) in registry.aktive_schnappschuss() {
        antwort.push_str(&format!("ID:{id},NAME:{name};"));
    }
    antwort
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ClientSession;
    use std::sync::Arc;

    #[test]
    fn antwort_format_pro_aktiver_sitzung() {
        let registry = ClientRegistry::neu();
        for name in ["anna", "bert"] {
            let (session, _kanaele) = ClientSession::neu(registry.naechste_client_id(), name, 8);
            registry.registrieren(Arc::clone(&session)).unwrap();
        }

        assert_eq!(
            aktive_benutzer_antwort(&registry),
            "ID:1,NAME:anna;ID:2,NAME:bert;"
        );
    }

    #[test]
    fn leere_registry_ergibt_leere_antwort() {
        let registry = ClientRegistry::neu();
        assert_eq!(aktive_benutzer_antwort(&registry), "");
    }

    #[test]
    fn ausgetragene_sitzung_taucht_nicht_mehr_auf() {
        let registry = ClientRegistry::neu();
        let (session, _kanaele) = ClientSession::neu(registry.naechste_client_id(), "anna", 8);
        registry.registrieren(session).unwrap();

        registry.abmelden("anna");
        assert_eq!(aktive_benutzer_antwort(&registry), "");
    }
}
