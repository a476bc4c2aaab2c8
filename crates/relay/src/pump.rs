//! Delivery Pump – Schreib-Schleife einer Sitzung
//!
//! Entleert die Sende-Queue der Sitzung und schreibt jedes Frame auf die
//! Schreib-Haelfte. Bei einem Schreibfehler wird die Sitzung deaktiviert
//! und die Schleife beendet; der Dispatcher derselben Sitzung bemerkt das
//! ueber den Shutdown-Kanal und uebernimmt den restlichen Abbau.

use futures_util::SinkExt;
use stammtisch_protocol::{FrameCodec, ServerFrame};
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedWrite;

use crate::session::ClientSession;

/// Schreibt die Sende-Queue einer Sitzung auf den Socket
pub struct DeliveryPump {
    session: Arc<ClientSession>,
}

impl DeliveryPump {
    /// Erstellt eine neue Pump
    pub fn neu(session: Arc<ClientSession>) -> Self {
        Self { session }
    }

    /// Startet die Schreib-Schleife
    ///
    /// Blockiert abwechselnd auf der Queue und dem Socket-Write; keine
    /// Sperre wird ueber einen Suspension-Punkt gehalten. Die Frames
    /// einer Queue verlassen den Socket in FIFO-Reihenfolge.
    pub async fn verarbeiten(
        self,
        mut framed: FramedWrite<OwnedWriteHalf, FrameCodec>,
        mut sende_rx: mpsc::Receiver<ServerFrame>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let client_id = self.session.id();

        loop {
            tokio::select! {
                frame = sende_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(fehler) = framed.send(frame).await {
                                tracing::warn!(
                                    client_id = %client_id,
                                    fehler = %fehler,
                                    "Schreiben fehlgeschlagen"
                                );
                                self.session.deaktivieren();
                                break;
                            }
                        }
                        None => {
                            // Alle Sender weg – Sitzung existiert nicht mehr
                            break;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(client_id = %client_id, "Shutdown-Signal der Sitzung");
                        break;
                    }
                }
            }
        }

        // Drop der Schreib-Haelfte gibt den Socket frei; ein zweites
        // Schliessen gibt es nicht
        tracing::debug!(client_id = %client_id, "Pump-Task beendet");
    }
}
