//! In-Memory-Cache mit Datei-Ablage
//!
//! Pro Identitaet haelt der Store eine Abbildung `absender -> nachrichten`.
//! Identitaeten sind an dieser Stelle bereits validiert (nur Buchstaben,
//! Ziffern, `-`, `_`, `.`), daher sind die Dateinamen unbedenklich.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::HistoryResult;

/// Historie einer Identitaet: absender -> empfangene Nachrichten
pub type HistorienAbbildung = BTreeMap<String, Vec<String>>;

/// Historien-Store mit einer Datei pro Identitaet
#[derive(Debug)]
pub struct HistoryStore {
    verzeichnis: PathBuf,
    eintraege: DashMap<String, HistorienAbbildung>,
}

impl HistoryStore {
    /// Erstellt einen Store der seine Dateien unter `verzeichnis` ablegt
    pub fn neu(verzeichnis: impl Into<PathBuf>) -> Self {
        Self {
            verzeichnis: verzeichnis.into(),
            eintraege: DashMap::new(),
        }
    }

    fn datei_pfad(&self, identitaet: &str) -> PathBuf {
        self.verzeichnis.join(format!("{identitaet}_hist.json"))
    }

    /// Laedt die Historie einer Identitaet in den Cache
    ///
    /// Eine fehlende Datei ergibt eine leere Historie.
    pub async fn laden(&self, identitaet: &str) -> HistoryResult<()> {
        let pfad = self.datei_pfad(identitaet);

        let abbildung = match tokio::fs::read_to_string(&pfad).await {
            Ok(inhalt) => serde_json::from_str(&inhalt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HistorienAbbildung::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            identitaet = identitaet,
            absender = abbildung.len(),
            "Historie geladen"
        );
        self.eintraege.insert(identitaet.to_string(), abbildung);
        Ok(())
    }

    /// Haengt eine zugestellte Nachricht an die Historie des Empfaengers an
    pub fn anhaengen(&self, identitaet: &str, absender: &str, text: &str) {
        self.eintraege
            .entry(identitaet.to_string())
            .or_default()
            .entry(absender.to_string())
            .or_default()
            .push(text.to_string());
    }

    /// Gibt die Historie einer Identitaet als JSON zurueck ("{}" wenn leer)
    pub fn als_json(&self, identitaet: &str) -> String {
        match self.eintraege.get(identitaet) {
            Some(abbildung) => {
                serde_json::to_string(abbildung.value()).unwrap_or_else(|_| "{}".into())
            }
            None => "{}".into(),
        }
    }

    /// Verschiebt den Cache-Eintrag bei einem Namenswechsel
    pub fn umbenennen(&self, alt: &str, neu: &str) {
        if let Some((_, abbildung)) = self.eintraege.remove(alt) {
            self.eintraege.insert(neu.to_string(), abbildung);
        }
    }

    /// Schreibt die Historie in ihre Datei und entlaedt den Cache-Eintrag
    ///
    /// Wird am Sitzungsende aufgerufen. Ohne Cache-Eintrag ein No-Op.
    pub async fn speichern(&self, identitaet: &str) -> HistoryResult<()> {
        let Some((_, abbildung)) = self.eintraege.remove(identitaet) else {
            return Ok(());
        };

        let pfad = self.datei_pfad(identitaet);
        if let Some(eltern) = pfad.parent() {
            tokio::fs::create_dir_all(eltern).await?;
        }

        let json = serde_json::to_string(&abbildung)?;
        tokio::fs::write(&pfad, json).await?;
        tracing::debug!(identitaet = identitaet, "Historie gespeichert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fehlende_datei_ergibt_leere_historie() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::neu(dir.path());

        store.laden("heinz").await.unwrap();
        assert_eq!(store.als_json("heinz"), "{}");
    }

    #[tokio::test]
    async fn anhaengen_und_abrufen() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::neu(dir.path());

        store.laden("heinz").await.unwrap();
        store.anhaengen("heinz", "erna", "hallo");
        store.anhaengen("heinz", "erna", "noch da?");
        store.anhaengen("heinz", "kurt", "moin");

        let json = store.als_json("heinz");
        let abbildung: HistorienAbbildung = serde_json::from_str(&json).unwrap();
        assert_eq!(abbildung["erna"], vec!["hallo", "noch da?"]);
        assert_eq!(abbildung["kurt"], vec!["moin"]);
    }

    #[tokio::test]
    async fn speichern_und_wieder_laden() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::neu(dir.path());

        store.laden("heinz").await.unwrap();
        store.anhaengen("heinz", "erna", "hallo");
        store.speichern("heinz").await.unwrap();

        // Nach dem Speichern ist der Cache entladen
        assert_eq!(store.als_json("heinz"), "{}");

        store.laden("heinz").await.unwrap();
        let abbildung: HistorienAbbildung =
            serde_json::from_str(&store.als_json("heinz")).unwrap();
        assert_eq!(abbildung["erna"], vec!["hallo"]);
    }

    #[tokio::test]
    async fn umbenennen_verschiebt_den_eintrag() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::neu(dir.path());

        store.anhaengen("heinz", "erna", "hallo");
        store.umbenennen("heinz", "heinrich");

        assert_eq!(store.als_json("heinz"), "{}");
        assert_ne!(store.als_json("heinrich"), "{}");
    }

    #[tokio::test]
    async fn speichern_ohne_eintrag_ist_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::neu(dir.path());
        store.speichern("niemand").await.unwrap();
    }
}
