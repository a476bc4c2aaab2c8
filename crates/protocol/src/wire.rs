//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + Text-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Der Payload ist genau ein Text-Kommando; eingebettete Zeilenumbrueche im
//! `msg:`-Teil sind dadurch unproblematisch. Ein nacktes `recv` ist unter
//! TCP keine Nachrichtengrenze; erst der Laengen-Prefix stellt die
//! Frame-Grenzen her, ohne das Text-Protokoll im Innern zu veraendern.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{ClientFrame, ServerFrame};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KB – Chat-Nachrichten sind klein)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Dekodiert den rohen Text-Payload als `String`; das Verb-Parsen passiert
/// eine Schicht hoeher in [`crate::frame`], damit ein unverstaendliches
/// Kommando die Verbindung nicht beendet. Encoder-Implementierungen gibt es
/// fuer beide Richtungen sowie fuer rohe Handshake-Tokens.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn payload_schreiben(&self, payload: &[u8], dst: &mut BytesMut) -> io::Result<()> {
        if payload.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    payload.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // Maximale Frame-Groesse pruefen
        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen
        src.advance(LENGTH_FIELD_SIZE);

        // Payload-Bytes extrahieren; kaputtes UTF-8 wird ersetzt statt die
        // Sitzung zu beenden – das Verb-Parsen verwirft es dann ohnehin
        let payload = src.split_to(length);
        Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierungen
// ---------------------------------------------------------------------------

/// Rohe Text-Payloads (Handshake-Tokens, Kapazitaets-Abweisung)
impl Encoder<String> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.payload_schreiben(item.as_bytes(), dst)
    }
}

/// Server-Ausgang (Delivery Pump)
impl Encoder<ServerFrame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ServerFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.payload_schreiben(item.to_wire().as_bytes(), dst)
    }
}

/// Client-Ausgang (Gegenstelle und Tests)
impl Encoder<ClientFrame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ClientFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.payload_schreiben(item.to_wire().as_bytes(), dst)
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Abschluss des Frames getrennt wird
/// - `InvalidData` bei zu grossem Frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    // Laengen-Feld lesen
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_be_bytes(len_buf) as usize;

    // Groesse pruefen
    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, max_frame_size
            ),
        ));
    }

    // Payload lesen
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    Ok(String::from_utf8_lossy(&payload).into_owned())
}

/// Schreibt einen einzelnen Text-Payload als Frame in einen `AsyncWrite`
///
/// # Fehler
/// - `InvalidData` wenn der Payload zu gross ist
/// - IO-Fehler beim Schreiben
pub async fn write_frame<W>(writer: &mut W, payload: &str, max_frame_size: usize) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                payload.len(),
                max_frame_size
            ),
        ));
    }

    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(payload.as_bytes()).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_codec_encode_decode_round_trip() {
        let mut codec = FrameCodec::new();
        let original = ClientFrame::SetName("heinz".into());

        // Kodieren
        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        // Laengen-Feld pruefen
        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert!(payload_len > 0);
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        // Dekodieren
        let zeile = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss ein Kommando enthalten");
        assert_eq!(ClientFrame::parse(&zeile).unwrap(), original);
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut codec = FrameCodec::new();

        let mut buf = BytesMut::new();
        codec.encode("alive".to_string(), &mut buf).unwrap();

        // Nur die Haelfte der Bytes behalten
        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        // Sollte None zurueckgeben (wartet auf mehr Daten)
        let result = codec.decode(&mut partial).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        let result = codec.decode(&mut buf).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn frame_codec_ablehnung_zu_grosser_frame() {
        let mut codec = FrameCodec::with_max_size(100);

        // Frame-Laenge von 200 Bytes im Buffer simulieren
        let mut buf = BytesMut::new();
        buf.put_u32(200); // 200 Bytes Payload
        buf.put_slice(&[b'x'; 200]);

        let result = codec.decode(&mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode_zu_grosse_nachricht() {
        // Kleines Limit setzen
        let mut codec = FrameCodec::with_max_size(4);

        let mut buf = BytesMut::new();
        let result = codec.encode("gethistory".to_string(), &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn frame_codec_mehrere_nachrichten_im_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        // Drei Kommandos kodieren – simuliert TCP-Koaleszierung
        // mehrerer Kommandos in einem Segment
        for name in ["anna", "berta", "carla"] {
            codec
                .encode(ClientFrame::SetName(name.into()), &mut buf)
                .unwrap();
        }

        // Alle drei dekodieren
        for name in ["anna", "berta", "carla"] {
            let zeile = codec.decode(&mut buf).unwrap().expect("Kommando erwartet");
            assert_eq!(
                ClientFrame::parse(&zeile).unwrap(),
                ClientFrame::SetName(name.into())
            );
        }

        // Buffer muss leer sein
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_default_max_size() {
        let codec = FrameCodec::new();
        assert_eq!(codec.max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
    }

    #[test]
    fn kaputtes_utf8_beendet_die_verbindung_nicht() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xff, 0xfe]);

        let zeile = codec.decode(&mut buf).unwrap().expect("Payload erwartet");
        // Ersetzte Zeichen ergeben ein unbekanntes Kommando – kein Fehler
        assert!(ClientFrame::parse(&zeile).is_err());
    }

    #[tokio::test]
    async fn async_read_write_frame_round_trip() {
        let original = ServerFrame::Log("Willkommen".into()).to_wire();

        // In-Memory Buffer verwenden
        let mut buffer: Vec<u8> = Vec::new();
        write_frame(&mut buffer, &original, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        assert!(buffer.len() > LENGTH_FIELD_SIZE);

        // Aus dem Buffer lesen
        let mut cursor = io::Cursor::new(buffer);
        let decoded = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn async_read_frame_ablehnung_zu_grosser_frame() {
        // Kleines Limit, grosse Laenge
        let mut buffer: Vec<u8> = Vec::new();
        // Laengen-Feld: 2 MB
        buffer.extend_from_slice(&(2u32 * 1024 * 1024).to_be_bytes());

        let mut cursor = io::Cursor::new(buffer);
        let result = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn async_write_frame_ablehnung_zu_grosse_nachricht() {
        let mut buffer: Vec<u8> = Vec::new();
        let result = write_frame(&mut buffer, "gethistory", 5).await; // Limit: 5 Bytes
        assert!(result.is_err());
    }
}
