//! Das `ZugangsPruefer`-Trait abstrahiert die Zulassungsentscheidung

/// Austauschbare Zulassungspruefung beim Handshake
///
/// Der Acceptor fragt nur dann ein Geheimnis ab (`?pass`), wenn
/// `erfordert_geheimnis` true liefert.
pub trait ZugangsPruefer: Send + Sync {
    /// Soll der Acceptor ein Geheimnis abfragen?
    fn erfordert_geheimnis(&self) -> bool;

    /// Entscheidet ueber die Zulassung von `name` mit `geheimnis`
    ///
    /// Bei Strategien ohne Geheimnis wird ein leerer String uebergeben.
    fn pruefen(&self, name: &str, geheimnis: &str) -> bool;
}

/// Zulassung ohne Geheimnis – jeder Name wird akzeptiert
#[derive(Debug, Clone, Copy, Default)]
pub struct OffenerZugang;

impl ZugangsPruefer for OffenerZugang {
    fn erfordert_geheimnis(&self) -> bool {
        false
    }

    fn pruefen(&self, _name: &str, _geheimnis: &str) -> bool {
        true
    }
}
