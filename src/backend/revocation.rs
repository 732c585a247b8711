//! Revocation checking capability.
//!
//! Transport (OCSP, CRL fetching) lives outside this crate. Path validation
//! only asks a [`RevocationChecker`] for an answer and applies the configured
//! [`RevocationPolicy`](crate::config::RevocationPolicy) to it.

use super::certificate::Certificate;

/// Answer from a revocation source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationStatus {
    /// Certificate is known not to be revoked
    Good,
    /// Certificate is revoked
    Revoked,
    /// No answer could be obtained (reason for logs)
    Unavailable(String),
}

/// Source of revocation answers.
pub trait RevocationChecker {
    /// Revocation status of `cert`, issued by `issuer`.
    fn check(&self, cert: &Certificate, issuer: &Certificate) -> RevocationStatus;
}

/// Revocation source that never has an answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocationSource;

impl RevocationChecker for NoRevocationSource {
    fn check(&self, _cert: &Certificate, _issuer: &Certificate) -> RevocationStatus {
        RevocationStatus::Unavailable("no revocation source configured".to_string())
    }
}

/// Offline revocation list keyed by issuer name and serial number.
///
/// Certificates not on the list are reported as [`RevocationStatus::Good`].
#[derive(Debug, Clone, Default)]
pub struct RevokedSerials {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RevokedSerials {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke by raw issuer Name DER and serial content octets.
    pub fn revoke(&mut self, issuer_raw: &[u8], serial: &[u8]) {
        self.entries.push((issuer_raw.to_vec(), serial.to_vec()));
    }

    /// Revoke a specific certificate.
    pub fn revoke_certificate(&mut self, cert: &Certificate) {
        self.revoke(cert.issuer_raw(), cert.serial());
    }

    /// Number of revoked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RevocationChecker for RevokedSerials {
    fn check(&self, cert: &Certificate, _issuer: &Certificate) -> RevocationStatus {
        let revoked = self
            .entries
            .iter()
            .any(|(issuer, serial)| issuer == cert.issuer_raw() && serial == cert.serial());
        if revoked {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::Good
        }
    }
}
