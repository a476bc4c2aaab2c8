//! Integrationstests gegen echte Sockets auf 127.0.0.1
//!
//! Jeder Test bindet Port 0 und bekommt so freie Ports vom System.

use futures_util::{SinkExt, StreamExt};
use stammtisch_auth::{DateiZugang, OffenerZugang, ZugangsPruefer};
use stammtisch_protocol::frame::{
    HANDSHAKE_ACCEPT, HANDSHAKE_NAME, HANDSHAKE_PASS, HANDSHAKE_REJECT, SERVER_VOLL_TEXT,
};
use stammtisch_protocol::{ClientFrame, FrameCodec, ServerFrame};
use stammtisch_relay::{DiscoveryServer, RelayConfig, RelayServer, RelayState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::watch;
use tokio_util::codec::Framed;

type Client = Framed<TcpStream, FrameCodec>;

async fn server_starten<Z>(
    state: Arc<RelayState<Z>>,
) -> (SocketAddr, watch::Sender<bool>)
where
    Z: ZugangsPruefer + 'static,
{
    let server = RelayServer::binden(state, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let adresse = server.lokale_adresse().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.starten(shutdown_rx));
    (adresse, shutdown_tx)
}

async fn verbinden(adresse: SocketAddr) -> Client {
    let stream = TcpStream::connect(adresse).await.unwrap();
    Framed::new(stream, FrameCodec::new())
}

/// Liest das naechste Frame mit Zeitlimit
async fn empfangen(client: &mut Client) -> String {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("Zeitlimit beim Lesen")
        .expect("Verbindung unerwartet geschlossen")
        .expect("Lesefehler")
}

/// Wartet darauf dass der Server die Verbindung schliesst
async fn auf_verbindungsende_warten(client: &mut Client) {
    let ende = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("Zeitlimit beim Warten auf das Verbindungsende");
    assert!(
        ende.is_none() || ende.unwrap().is_err(),
        "Verbindung haette geschlossen sein muessen"
    );
}

/// Handshake ohne Geheimnis; gibt die zugewiesene Client-ID zurueck
async fn anmelden(client: &mut Client, name: &str) -> u64 {
    assert_eq!(empfangen(client).await, HANDSHAKE_NAME);
    client.send(name.to_string()).await.unwrap();
    assert_eq!(empfangen(client).await, HANDSHAKE_ACCEPT);
    match ServerFrame::parse(&empfangen(client).await).unwrap() {
        ServerFrame::SetId(id) => id.inner(),
        anderes => panic!("setid erwartet, bekam {anderes:?}"),
    }
}

async fn kommando_senden(client: &mut Client, frame: ClientFrame) {
    client.send(frame.to_wire()).await.unwrap();
}

#[tokio::test]
async fn zulassung_und_direktnachricht() {
    let state = RelayState::neu(RelayConfig::default(), Arc::new(OffenerZugang), None);
    let (adresse, _shutdown) = server_starten(state).await;

    let mut anna = verbinden(adresse).await;
    let anna_id = anmelden(&mut anna, "anna").await;
    assert_eq!(anna_id, 1);

    let mut bert = verbinden(adresse).await;
    let bert_id = anmelden(&mut bert, "bert").await;
    assert_eq!(bert_id, 2);

    // bert -> anna, mehrzeiliger Text
    kommando_senden(
        &mut bert,
        ClientFrame::SendTo {
            ziele: vec!["anna".into()],
            text: "hallo anna\nwie gehts?\n".into(),
        },
    )
    .await;

    let bei_anna = ServerFrame::parse(&empfangen(&mut anna).await).unwrap();
    assert_eq!(
        bei_anna,
        ServerFrame::MsgFrom {
            absender_id: stammtisch_core::ClientId(bert_id),
            absender_name: "bert".into(),
            text: "hallo anna\nwie gehts?\n".into(),
        }
    );

    let quittung = ServerFrame::parse(&empfangen(&mut bert).await).unwrap();
    assert!(matches!(quittung, ServerFrame::Log(text) if text.contains("successfully")));
}

#[tokio::test]
async fn kapazitaet_wird_durchgesetzt() {
    let config = RelayConfig {
        max_clients: 1,
        ..RelayConfig::default()
    };
    let state = RelayState::neu(config, Arc::new(OffenerZugang), None);
    let (adresse, _shutdown) = server_starten(state).await;

    let mut anna = verbinden(adresse).await;
    anmelden(&mut anna, "anna").await;

    // Der zweite Versuch bekommt die Klartext-Abweisung und wird getrennt
    let mut bert = verbinden(adresse).await;
    assert_eq!(empfangen(&mut bert).await, HANDSHAKE_NAME);
    bert.send("bert".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut bert).await, SERVER_VOLL_TEXT);
    auf_verbindungsende_warten(&mut bert).await;

    // Der Abgewiesene ist nirgends eingetragen
    kommando_senden(
        &mut anna,
        ClientFrame::SendTo {
            ziele: vec!["bert".into()],
            text: "bist du da?".into(),
        },
    )
    .await;
    let antwort = ServerFrame::parse(&empfangen(&mut anna).await).unwrap();
    assert!(matches!(antwort, ServerFrame::Log(text) if text.contains("doesn't exist")));
}

#[tokio::test]
async fn leerlauf_timeout_beendet_die_sitzung() {
    let config = RelayConfig {
        leerlauf_timeout_sek: 1,
        ..RelayConfig::default()
    };
    let state = RelayState::neu(config, Arc::new(OffenerZugang), None);
    let (adresse, _shutdown) = server_starten(state).await;

    let mut anna = verbinden(adresse).await;
    anmelden(&mut anna, "anna").await;

    // Kein Frame, kein `alive` – der Server traegt aus und schliesst
    auf_verbindungsende_warten(&mut anna).await;

    // Der Name ist danach wieder frei
    let mut wieder = verbinden(adresse).await;
    anmelden(&mut wieder, "anna").await;
}

#[tokio::test]
async fn close_gibt_den_namen_frei() {
    let state = RelayState::neu(RelayConfig::default(), Arc::new(OffenerZugang), None);
    let (adresse, _shutdown) = server_starten(state).await;

    let mut anna = verbinden(adresse).await;
    anmelden(&mut anna, "anna").await;

    // Solange anna verbunden ist, wird die Doppel-Zulassung abgewiesen
    let mut doppelgaenger = verbinden(adresse).await;
    assert_eq!(empfangen(&mut doppelgaenger).await, HANDSHAKE_NAME);
    doppelgaenger.send("anna".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut doppelgaenger).await, HANDSHAKE_REJECT);

    kommando_senden(&mut anna, ClientFrame::Close).await;
    auf_verbindungsende_warten(&mut anna).await;

    let mut wieder = verbinden(adresse).await;
    anmelden(&mut wieder, "anna").await;
}

#[tokio::test]
async fn zulassung_mit_zugangsdatei() {
    let verzeichnis = tempfile::tempdir().unwrap();
    let zugang = DateiZugang::laden(verzeichnis.path().join("clients_list.json"))
        .await
        .unwrap();
    let state = RelayState::neu(RelayConfig::default(), Arc::new(zugang), None);
    let (adresse, _shutdown) = server_starten(state).await;

    // Erstkontakt: Name wird mit diesem Geheimnis eingetragen
    let mut anna = verbinden(adresse).await;
    assert_eq!(empfangen(&mut anna).await, HANDSHAKE_NAME);
    anna.send("anna".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut anna).await, HANDSHAKE_PASS);
    anna.send("geheim".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut anna).await, HANDSHAKE_ACCEPT);
    let _ = ServerFrame::parse(&empfangen(&mut anna).await).unwrap();

    kommando_senden(&mut anna, ClientFrame::Close).await;
    auf_verbindungsende_warten(&mut anna).await;

    // Falsches Geheimnis wird abgewiesen
    let mut falsch = verbinden(adresse).await;
    assert_eq!(empfangen(&mut falsch).await, HANDSHAKE_NAME);
    falsch.send("anna".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut falsch).await, HANDSHAKE_PASS);
    falsch.send("falsch".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut falsch).await, HANDSHAKE_REJECT);

    // Richtiges Geheimnis kommt wieder rein
    let mut wieder = verbinden(adresse).await;
    assert_eq!(empfangen(&mut wieder).await, HANDSHAKE_NAME);
    wieder.send("anna".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut wieder).await, HANDSHAKE_PASS);
    wieder.send("geheim".to_string()).await.unwrap();
    assert_eq!(empfangen(&mut wieder).await, HANDSHAKE_ACCEPT);
}

#[tokio::test]
async fn discovery_listet_aktive_benutzer() {
    let state = RelayState::neu(RelayConfig::default(), Arc::new(OffenerZugang), None);
    let (adresse, _shutdown) = server_starten(Arc::clone(&state)).await;

    let discovery = DiscoveryServer::binden("127.0.0.1:0".parse().unwrap(), state.registry.clone())
        .await
        .unwrap();
    let discovery_adresse = discovery.lokale_adresse().unwrap();
    let (discovery_shutdown_tx, discovery_shutdown_rx) = watch::channel(false);
    tokio::spawn(discovery.starten(discovery_shutdown_rx));

    let mut anna = verbinden(adresse).await;
    anmelden(&mut anna, "anna").await;
    let mut bert = verbinden(adresse).await;
    anmelden(&mut bert, "bert").await;

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(b"getactiveusers", discovery_adresse)
        .await
        .unwrap();

    let mut puffer = [0u8; 1024];
    let (laenge, _) = tokio::time::timeout(Duration::from_secs(5), socket.recv_from(&mut puffer))
        .await
        .expect("Zeitlimit bei der Discovery-Antwort")
        .unwrap();
    assert_eq!(
        String::from_utf8_lossy(&puffer[..laenge]),
        "ID:1,NAME:anna;ID:2,NAME:bert;"
    );

    drop(discovery_shutdown_tx);
}
