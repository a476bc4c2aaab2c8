//! Client-Registry – Identitaet -> Sitzung
//!
//! Eine einzige Tabelle hinter einer einzigen Lese/Schreib-Sperre:
//! strukturelle Aenderungen (eintragen, austragen, umbenennen) laufen
//! serialisiert, Lesezugriffe (`suchen`, `aktive_schnappschuss`) parallel
//! und sehen nie einen halb entfernten Eintrag. Der Schnappschuss ist
//! eine konsistente Momentaufnahme unter der Lesesperre.
//!
//! Bekannte, akzeptierte Wettlauf-Situation: zwischen einem `setname`
//! und einem gleichzeitig eintreffenden `sendto` auf den alten Namen
//! gibt es keine Ordnungsgarantie; die Nachricht trifft den alten oder
//! den neuen Schluesselstand.

use parking_lot::RwLock;
use stammtisch_core::{ClientId, ClientStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::RelayError;
use crate::session::ClientSession;

/// Prozessweite Abbildung Identitaet -> Sitzung
///
/// Thread-safe via Arc + RwLock. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    tabelle: RwLock<HashMap<String, Arc<ClientSession>>>,
    /// Fortlaufende ID-Vergabe; 0 ist die Broadcast-Kennung
    naechste_id: AtomicU64,
}

impl ClientRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                tabelle: RwLock::new(HashMap::new()),
                naechste_id: AtomicU64::new(1),
            }),
        }
    }

    /// Vergibt die naechste verbindungsgebundene Client-ID
    pub fn naechste_client_id(&self) -> ClientId {
        ClientId(self.inner.naechste_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Traegt eine Sitzung unter ihrer Identitaet ein
    ///
    /// Schlaegt mit `NameKonflikt` fehl wenn die Identitaet bereits von
    /// einer aktiven Sitzung belegt ist – so wird eine doppelte Zulassung
    /// abgewiesen. Nach dem Austragen ist der Name wieder frei.
    pub fn registrieren(&self, session: Arc<ClientSession>) -> Result<(), RelayError> {
        let mut tabelle = self.inner.tabelle.write();
        Self::eintragen(&mut tabelle, session)
    }

    /// Kapazitaetspruefung und Eintragung unter einer Sperre
    ///
    /// Der Acceptor laesst Handshakes nebenlaeufig laufen; damit die
    /// (N+1)-te Zulassung nicht durchrutscht, muss die Pruefung gegen
    /// `max_clients` atomar mit dem Eintragen passieren.
    pub fn registrieren_mit_limit(
        &self,
        session: Arc<ClientSession>,
        max_clients: usize,
    ) -> Result<(), RelayError> {
        let mut tabelle = self.inner.tabelle.write();
        if tabelle.len() >= max_clients {
            return Err(RelayError::ServerVoll);
        }
        Self::eintragen(&mut tabelle, session)
    }

    fn eintragen(
        tabelle: &mut HashMap<String, Arc<ClientSession>>,
        session: Arc<ClientSession>,
    ) -> Result<(), RelayError> {
        let name = session.name();
        match tabelle.get(&name) {
            Some(bestehend) if bestehend.ist_aktiv() => Err(RelayError::NameKonflikt(name)),
            _ => {
                tracing::debug!(client_id = %session.id(), name = %name, "Sitzung eingetragen");
                tabelle.insert(name, session);
                Ok(())
            }
        }
    }

    /// Traegt eine Identitaet aus; ohne Eintrag ein No-Op
    ///
    /// Dispatcher und Pump derselben Sitzung duerfen sich hier ueberholen,
    /// der zweite Aufruf findet nichts mehr vor.
    pub fn abmelden(&self, name: &str) -> Option<Arc<ClientSession>> {
        let entfernt = self.inner.tabelle.write().remove(name);
        if entfernt.is_some() {
            tracing::debug!(name = name, "Sitzung ausgetragen");
        }
        entfernt
    }

    /// Schluesselt eine Sitzung auf eine neue Identitaet um
    ///
    /// Austragen unter dem alten und Eintragen unter dem neuen Namen
    /// passieren atomar unter der Schreibsperre.
    pub fn umbenennen(&self, alt: &str, neu: &str) -> Result<(), RelayError> {
        let mut tabelle = self.inner.tabelle.write();

        if let Some(bestehend) = tabelle.get(neu) {
            if bestehend.ist_aktiv() {
                return Err(RelayError::NameKonflikt(neu.to_string()));
            }
        }

        let session = tabelle
            .remove(alt)
            .ok_or_else(|| RelayError::intern(format!("unbekannte Identitaet: {alt}")))?;
        session.name_setzen(neu);
        tabelle.insert(neu.to_string(), session);
        Ok(())
    }

    /// Sucht die Sitzung zu einer Identitaet
    pub fn suchen(&self, name: &str) -> Option<Arc<ClientSession>> {
        self.inner.tabelle.read().get(name).cloned()
    }

    /// Konsistente Momentaufnahme aller aktiven Sitzungen
    ///
    /// Sortiert nach Client-ID (Zulassungsreihenfolge); Grundlage fuer
    /// Discovery-Antworten.
    pub fn aktive_schnappschuss(&self) -> Vec<(ClientId, String, ClientStatus)> {
        let tabelle = self.inner.tabelle.read();
        let mut liste: Vec<_> = tabelle
            .iter()
            .map(|(name, session)| (session.id(), name.clone(), session.status()))
            .collect();
        liste.sort_by_key(|(id, _, _)| *id);
        liste
    }

    /// Alle Sitzungen ausser der angegebenen (Broadcast-Fan-out)
    pub fn alle_ausser(&self, ausgeschlossen: ClientId) -> Vec<Arc<ClientSession>> {
        self.inner
            .tabelle
            .read()
            .values()
            .filter(|session| session.id() != ausgeschlossen)
            .cloned()
            .collect()
    }

    /// Gibt die Anzahl eingetragener Sitzungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.tabelle.read().len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
