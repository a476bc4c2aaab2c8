//! Geheimnis-Digests mit SHA-256
//!
//! Die Zugangsdatei speichert keine Klartext-Geheimnisse, sondern deren
//! SHA-256-Hex-Digest. Die Staerke des Verfahrens ist ausdruecklich kein
//! Ziel dieses Servers.

use sha2::{Digest, Sha256};

/// Bildet den SHA-256-Hex-Digest eines Geheimnisses
pub fn geheimnis_hashen(geheimnis: &str) -> String {
    let digest = Sha256::digest(geheimnis.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Verifiziert ein Geheimnis gegen einen gespeicherten Digest
pub fn geheimnis_verifizieren(geheimnis: &str, digest: &str) -> bool {
    geheimnis_hashen(geheimnis) == digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashen_und_verifizieren() {
        let digest = geheimnis_hashen("geheim123");
        assert_eq!(digest.len(), 64);
        assert!(geheimnis_verifizieren("geheim123", &digest));
    }

    #[test]
    fn falsches_geheimnis_wird_abgelehnt() {
        let digest = geheimnis_hashen("richtig");
        assert!(!geheimnis_verifizieren("falsch", &digest));
    }

    #[test]
    fn digest_ist_deterministisch() {
        assert_eq!(geheimnis_hashen("a"), geheimnis_hashen("a"));
        assert_ne!(geheimnis_hashen("a"), geheimnis_hashen("b"));
    }
}
