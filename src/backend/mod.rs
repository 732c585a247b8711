//! Crypto backend context.
//!
//! [`CryptoContext`] is the explicit handle for state that a certificate
//! database would otherwise keep process-wide: the trust anchors, the pool of
//! temporary certificates registered by signed messages, the revocation
//! source and the verification options.
//!
//! ## Lifecycle
//!
//! - [`CryptoContext::initialize`] starts the backend
//! - signed messages borrow the context and register their embedded
//!   certificates in the temporary pool, undoing the registration when dropped
//! - [`CryptoContext::shutdown`] tears the backend down exactly once
//!
//! The context is not `Sync`: a verification flow owns it, and concurrent
//! flows each initialize their own.

mod certificate;
mod revocation;
mod trust_store;

pub use certificate::{Certificate, ExtendedKeyUsageFlags, KeyUsageFlags};
pub use revocation::{NoRevocationSource, RevocationChecker, RevocationStatus, RevokedSerials};
pub use trust_store::{DefaultStoreResolver, MozillaProfileResolver, NoDefaultStore, TrustStore};

use crate::config::VerifyOptions;
use crate::error::{Error, Result};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handle to one registered set of temporary certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

#[derive(Default)]
struct TemporaryPool {
    next_id: u64,
    sets: BTreeMap<RegistrationId, Vec<Arc<Certificate>>>,
}

/// Initialized crypto backend.
pub struct CryptoContext {
    store: TrustStore,
    options: VerifyOptions,
    revocation: Box<dyn RevocationChecker>,
    temporary: RefCell<TemporaryPool>,
    torn_down: Cell<bool>,
}

impl CryptoContext {
    /// Start the backend with a trust store and options.
    pub fn initialize(store: TrustStore, options: VerifyOptions) -> Result<Self> {
        if options.max_chain_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_chain_depth must be at least 1".to_string(),
            ));
        }

        log::info!("Crypto backend initialized with {} trust anchor(s)", store.len());
        Ok(Self {
            store,
            options,
            revocation: Box::new(NoRevocationSource),
            temporary: RefCell::new(TemporaryPool::default()),
            torn_down: Cell::new(false),
        })
    }

    /// Replace the revocation source.
    pub fn with_revocation_checker(mut self, checker: impl RevocationChecker + 'static) -> Self {
        self.revocation = Box::new(checker);
        self
    }

    /// Verification options.
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Trust anchors.
    pub fn trust_store(&self) -> &TrustStore {
        &self.store
    }

    /// Revocation source.
    pub fn revocation_checker(&self) -> &dyn RevocationChecker {
        self.revocation.as_ref()
    }

    /// Register certificates as temporary entries.
    pub fn register_temporary(&self, certs: Vec<Arc<Certificate>>) -> RegistrationId {
        let mut pool = self.temporary.borrow_mut();
        let id = RegistrationId(pool.next_id);
        pool.next_id += 1;
        log::debug!("Registered {} temporary certificate(s) as {:?}", certs.len(), id);
        pool.sets.insert(id, certs);
        id
    }

    /// Undo a registration. Returns the number of certificates released;
    /// an unknown id releases nothing.
    pub fn unregister_temporary(&self, id: RegistrationId) -> usize {
        match self.temporary.borrow_mut().sets.remove(&id) {
            Some(certs) => {
                log::debug!("Released {} temporary certificate(s) from {:?}", certs.len(), id);
                certs.len()
            },
            None => 0,
        }
    }

    /// Number of registered temporary sets.
    pub fn outstanding_registrations(&self) -> usize {
        self.temporary.borrow().sets.len()
    }

    /// First certificate matching `predicate`: temporary entries first, then
    /// trust anchors.
    pub fn find_certificate<F>(&self, mut predicate: F) -> Option<Arc<Certificate>>
    where
        F: FnMut(&Certificate) -> bool,
    {
        let pool = self.temporary.borrow();
        pool.sets
            .values()
            .flatten()
            .chain(self.store.anchors())
            .find(|cert| predicate(cert))
            .cloned()
    }

    /// Every known certificate whose subject is `subject_raw`, anchors first.
    pub fn find_by_subject(&self, subject_raw: &[u8]) -> Vec<Arc<Certificate>> {
        let pool = self.temporary.borrow();
        let mut found: Vec<Arc<Certificate>> = Vec::new();
        for cert in self.store.anchors().iter().chain(pool.sets.values().flatten()) {
            if cert.subject_raw() == subject_raw && !found.iter().any(|f| **f == **cert) {
                found.push(Arc::clone(cert));
            }
        }
        found
    }

    /// Whether `cert` is a trust anchor.
    pub fn is_trust_anchor(&self, cert: &Certificate) -> bool {
        self.store.contains(cert)
    }

    /// Tear down the backend.
    ///
    /// Fails with [`Error::BackendBusy`] if temporary certificates were never
    /// released. Teardown is attempted exactly once either way.
    pub fn shutdown(self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&self) -> Result<()> {
        if self.torn_down.replace(true) {
            return Ok(());
        }

        let mut pool = self.temporary.borrow_mut();
        let outstanding = pool.sets.len();
        pool.sets.clear();
        if outstanding > 0 {
            return Err(Error::BackendBusy { outstanding });
        }

        log::info!("Crypto backend shut down");
        Ok(())
    }
}

impl Drop for CryptoContext {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::error!("Crypto backend teardown failed: {}", e);
        }
    }
}

impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("anchors", &self.store.len())
            .field("temporary_sets", &self.outstanding_registrations())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(name: &str) -> Arc<Certificate> {
        let certified = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
        Arc::new(Certificate::from_der(certified.cert.der()).unwrap())
    }

    #[test]
    fn test_initialize_rejects_zero_depth() {
        let opts = VerifyOptions::default().with_max_chain_depth(0);
        let err = CryptoContext::initialize(TrustStore::new(), opts).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_register_and_unregister() {
        let ctx = CryptoContext::initialize(TrustStore::new(), VerifyOptions::default()).unwrap();
        let c = cert("temp.test");

        let id = ctx.register_temporary(vec![Arc::clone(&c)]);
        assert_eq!(ctx.outstanding_registrations(), 1);
        assert!(ctx.find_certificate(|x| x == &*c).is_some());

        assert_eq!(ctx.unregister_temporary(id), 1);
        assert_eq!(ctx.unregister_temporary(id), 0);
        assert_eq!(ctx.outstanding_registrations(), 0);
        assert!(ctx.find_certificate(|x| x == &*c).is_none());

        ctx.shutdown().unwrap();
    }

    #[test]
    fn test_find_by_subject_prefers_anchors() {
        let c = cert("anchor.test");
        let mut store = TrustStore::new();
        store.add_anchor((*c).clone());

        let ctx = CryptoContext::initialize(store, VerifyOptions::default()).unwrap();
        let id = ctx.register_temporary(vec![Arc::clone(&c)]);

        let found = ctx.find_by_subject(c.subject_raw());
        assert_eq!(found.len(), 1);
        assert!(ctx.is_trust_anchor(&found[0]));

        ctx.unregister_temporary(id);
        ctx.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_with_outstanding_registration() {
        let ctx = CryptoContext::initialize(TrustStore::new(), VerifyOptions::default()).unwrap();
        ctx.register_temporary(vec![cert("leak.test")]);

        let err = ctx.shutdown().unwrap_err();
        assert!(matches!(err, Error::BackendBusy { outstanding: 1 }));
    }
}
