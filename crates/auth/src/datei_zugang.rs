//! Datei-gestuetzte Zulassung mit SHA-256-Digests
//!
//! Die Zugangsdatei ist eine JSON-Abbildung `name -> digest`. Bekannte
//! Namen werden gegen ihren Digest verifiziert; ein unbekannter Name wird
//! beim ersten Kontakt mit dem Digest seines Geheimnisses eingetragen
//! (Selbstregistrierung). Persistiert wird beim Server-Shutdown.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::AuthResult;
use crate::passwort::{geheimnis_hashen, geheimnis_verifizieren};
use crate::pruefer::ZugangsPruefer;

/// Zulassung gegen eine JSON-Zugangsdatei
#[derive(Debug)]
pub struct DateiZugang {
    pfad: PathBuf,
    /// name -> SHA-256-Hex-Digest
    eintraege: DashMap<String, String>,
}

impl DateiZugang {
    /// Laedt die Zugangsdatei; eine fehlende Datei ergibt einen leeren Stand
    pub async fn laden(pfad: impl Into<PathBuf>) -> AuthResult<Self> {
        let pfad = pfad.into();
        let eintraege = DashMap::new();

        match tokio::fs::read_to_string(&pfad).await {
            Ok(inhalt) => {
                let abbildung: BTreeMap<String, String> = serde_json::from_str(&inhalt)?;
                for (name, digest) in abbildung {
                    eintraege.insert(name, digest);
                }
                tracing::debug!(
                    pfad = %pfad.display(),
                    eintraege = eintraege.len(),
                    "Zugangsdatei geladen"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(pfad = %pfad.display(), "Keine Zugangsdatei, starte leer");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self { pfad, eintraege })
    }

    /// Schreibt den aktuellen Stand in die Zugangsdatei
    pub async fn speichern(&self) -> AuthResult<()> {
        let abbildung: BTreeMap<String, String> = self
            .eintraege
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let json = serde_json::to_string(&abbildung)?;
        tokio::fs::write(&self.pfad, json).await?;
        tracing::debug!(
            pfad = %self.pfad.display(),
            eintraege = abbildung.len(),
            "Zugangsdatei gespeichert"
        );
        Ok(())
    }

    /// Gibt die Anzahl bekannter Namen zurueck
    pub fn anzahl(&self) -> usize {
        self.eintraege.len()
    }

    /// Prueft ob ein Name bereits eingetragen ist
    pub fn ist_bekannt(&self, name: &str) -> bool {
        self.eintraege.contains_key(name)
    }
}

impl ZugangsPruefer for DateiZugang {
    fn erfordert_geheimnis(&self) -> bool {
        true
    }

    fn pruefen(&self, name: &str, geheimnis: &str) -> bool {
        // entry() haelt den Shard-Lock, damit zwei gleichzeitige
        // Erstkontakte desselben Namens nicht beide gewinnen
        let eintrag = self
            .eintraege
            .entry(name.to_string())
            .or_insert_with(|| geheimnis_hashen(geheimnis));

        let korrekt = geheimnis_verifizieren(geheimnis, eintrag.value());
        if !korrekt {
            tracing::info!(name = name, "Zulassung verweigert: falsches Geheimnis");
        }
        korrekt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn leerer_zugang() -> (tempfile::TempDir, DateiZugang) {
        let dir = tempfile::tempdir().unwrap();
        let zugang = DateiZugang::laden(dir.path().join("clients_list.json"))
            .await
            .unwrap();
        (dir, zugang)
    }

    #[tokio::test]
    async fn erstkontakt_traegt_namen_ein() {
        let (_dir, zugang) = leerer_zugang().await;

        assert!(!zugang.ist_bekannt("heinz"));
        assert!(zugang.pruefen("heinz", "geheim"));
        assert!(zugang.ist_bekannt("heinz"));
        assert_eq!(zugang.anzahl(), 1);
    }

    #[tokio::test]
    async fn bekannter_name_wird_verifiziert() {
        let (_dir, zugang) = leerer_zugang().await;

        assert!(zugang.pruefen("heinz", "geheim"));
        assert!(zugang.pruefen("heinz", "geheim"));
        assert!(!zugang.pruefen("heinz", "falsch"));
    }

    #[tokio::test]
    async fn speichern_und_wieder_laden() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("clients_list.json");

        let zugang = DateiZugang::laden(&pfad).await.unwrap();
        assert!(zugang.pruefen("erna", "geheim1"));
        assert!(zugang.pruefen("kurt", "geheim2"));
        zugang.speichern().await.unwrap();

        let wieder = DateiZugang::laden(&pfad).await.unwrap();
        assert_eq!(wieder.anzahl(), 2);
        assert!(wieder.pruefen("erna", "geheim1"));
        assert!(!wieder.pruefen("erna", "geheim2"));
    }

    #[tokio::test]
    async fn kaputte_zugangsdatei_ist_ein_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("clients_list.json");
        tokio::fs::write(&pfad, "kein json").await.unwrap();

        assert!(DateiZugang::laden(&pfad).await.is_err());
    }
}
