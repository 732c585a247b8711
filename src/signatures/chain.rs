//! Certificates materialized from a signed message.

use crate::backend::{Certificate, CryptoContext, RegistrationId};
use cms::cert::CertificateChoices;
use cms::signed_data::SignedData;
use der::Encode;
use std::sync::Arc;

/// The embedded certificates of one message, registered with the context as
/// temporary entries for as long as the set is alive.
///
/// An empty set means the chain is unavailable. Release is idempotent and
/// also happens on drop.
pub struct MaterializedCertificateSet<'ctx> {
    ctx: &'ctx CryptoContext,
    certificates: Vec<Arc<Certificate>>,
    registration: Option<RegistrationId>,
    skipped: usize,
}

impl<'ctx> MaterializedCertificateSet<'ctx> {
    /// Decode the embedded certificates of `signed_data` and register them.
    ///
    /// Entries that are not X.509 certificates or fail to decode are
    /// skipped; a message without certificates yields an empty set.
    pub fn materialize(ctx: &'ctx CryptoContext, signed_data: &SignedData) -> Self {
        let mut certificates = Vec::new();
        let mut skipped = 0;

        let choices = signed_data.certificates.iter().flat_map(|set| set.0.iter());
        for choice in choices {
            let CertificateChoices::Certificate(cert) = choice else {
                log::debug!("Skipping non-X.509 certificate choice");
                skipped += 1;
                continue;
            };

            let parsed = cert
                .to_der()
                .map_err(|e| e.to_string())
                .and_then(|der| Certificate::from_der(&der).map_err(|e| e.to_string()));
            match parsed {
                Ok(cert) => certificates.push(Arc::new(cert)),
                Err(e) => {
                    log::warn!("Skipping undecodable embedded certificate: {}", e);
                    skipped += 1;
                },
            }
        }

        let registration = if certificates.is_empty() {
            None
        } else {
            Some(ctx.register_temporary(certificates.clone()))
        };

        Self {
            ctx,
            certificates,
            registration,
            skipped,
        }
    }

    /// A set with no certificates and no registration.
    pub fn empty(ctx: &'ctx CryptoContext) -> Self {
        Self {
            ctx,
            certificates: Vec::new(),
            registration: None,
            skipped: 0,
        }
    }

    /// Whether no certificate was materialized.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Number of materialized certificates.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Materialized certificates.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Certificate>> {
        self.certificates.iter()
    }

    /// First certificate matching `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Option<Arc<Certificate>>
    where
        F: FnMut(&Certificate) -> bool,
    {
        self.certificates
            .iter()
            .find(|cert| predicate(cert))
            .cloned()
    }

    /// Number of embedded entries that could not be materialized.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether the registration has been undone.
    pub fn is_released(&self) -> bool {
        self.registration.is_none()
    }

    /// Undo the registration with the context. Returns the number of
    /// certificates released; a second call releases nothing.
    pub fn release(&mut self) -> usize {
        match self.registration.take() {
            Some(id) => self.ctx.unregister_temporary(id),
            None => 0,
        }
    }
}

impl Drop for MaterializedCertificateSet<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MaterializedCertificateSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedCertificateSet")
            .field("certificates", &self.certificates.len())
            .field("skipped", &self.skipped)
            .field("registered", &self.registration.is_some())
            .finish()
    }
}
