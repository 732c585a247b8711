//! Trust anchors and default store discovery.

use super::certificate::Certificate;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extensions recognized by [`TrustStore::load_directory`].
const CERT_EXTENSIONS: [&str; 4] = ["der", "cer", "crt", "pem"];

/// NSS certificate database files. They are not read.
const NSS_DATABASES: [&str; 2] = ["cert9.db", "cert8.db"];

/// Set of trusted root certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<Arc<Certificate>>,
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a DER-encoded trust anchor.
    pub fn add_anchor_der(&mut self, der: &[u8]) -> Result<()> {
        let cert = Certificate::from_der(der)?;
        self.add_anchor(cert);
        Ok(())
    }

    /// Add an already parsed trust anchor. Duplicates are ignored.
    pub fn add_anchor(&mut self, cert: Certificate) {
        if self.anchors.iter().any(|a| **a == cert) {
            log::debug!("Skipping duplicate trust anchor {}", cert.subject());
            return;
        }
        self.anchors.push(Arc::new(cert));
    }

    /// Add every CERTIFICATE block of a PEM buffer. Returns the number added.
    pub fn add_anchors_pem(&mut self, pem: &[u8]) -> Result<usize> {
        let mut added = 0;
        for block in x509_parser::pem::Pem::iter_from_buffer(pem) {
            let block = block.map_err(|e| Error::TrustStore(format!("invalid PEM: {e}")))?;
            if block.label != "CERTIFICATE" {
                log::debug!("Skipping PEM block labelled {}", block.label);
                continue;
            }
            self.add_anchor_der(&block.contents)?;
            added += 1;
        }
        Ok(added)
    }

    /// Load every certificate file in `dir`.
    ///
    /// Files with a `.der`, `.cer`, `.crt` or `.pem` extension are read as
    /// DER first, then as PEM. Unreadable certificates are skipped with a
    /// warning. Returns the number of anchors added.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut added = 0;

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let recognized = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| CERT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !path.is_file() || !recognized {
                continue;
            }

            let data = std::fs::read(&path)?;
            let before = self.anchors.len();
            let loaded = match self.add_anchor_der(&data) {
                Ok(()) => Ok(self.anchors.len() - before),
                Err(_) => self.add_anchors_pem(&data),
            };

            match loaded {
                Ok(0) => log::debug!("No new certificate in {}", path.display()),
                Ok(n) => added += n,
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        log::info!("Loaded {} trust anchor(s) from {}", added, dir.display());
        Ok(added)
    }

    /// Build a store from the location a resolver points at.
    ///
    /// The resolved directory is read with [`TrustStore::load_directory`], so
    /// only DER and PEM certificate files count. A resolver with no answer
    /// yields an empty store, and so does a directory holding nothing but an
    /// NSS database.
    pub fn from_resolver(resolver: &dyn DefaultStoreResolver) -> Result<Self> {
        let mut store = Self::new();
        let Some(path) = resolver.resolve_default_store() else {
            log::debug!("No default trust store location resolved");
            return Ok(store);
        };

        if store.load_directory(&path)? == 0 {
            if NSS_DATABASES.iter().any(|db| path.join(db).is_file()) {
                log::warn!(
                    "{} is an NSS certificate database; export its roots as PEM to use them",
                    path.display()
                );
            } else {
                log::warn!("No trust anchors found in {}", path.display());
            }
        }
        Ok(store)
    }

    /// Trust anchors.
    pub fn anchors(&self) -> &[Arc<Certificate>] {
        &self.anchors
    }

    /// Whether `cert` is one of the anchors.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.anchors.iter().any(|a| **a == *cert)
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the store has no anchors.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Locates the default trust store on this machine.
pub trait DefaultStoreResolver {
    /// Directory of the default store, if one exists.
    ///
    /// The directory is expected to hold DER or PEM certificate files.
    fn resolve_default_store(&self) -> Option<PathBuf>;
}

/// Resolver with no default store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefaultStore;

impl DefaultStoreResolver for NoDefaultStore {
    fn resolve_default_store(&self) -> Option<PathBuf> {
        None
    }
}

/// Locator for the Mozilla NSS certificate database.
///
/// Resolves to the first Firefox profile whose folder name contains
/// "default", falling back to a system NSS directory. Those directories hold
/// `cert9.db` rather than certificate files, so [`TrustStore::from_resolver`]
/// finds no anchors there unless roots were exported next to the database.
/// Use [`MozillaProfileResolver::resolve_default_store`] to locate the
/// database and load anchors from an exported PEM bundle instead.
#[derive(Debug, Clone)]
pub struct MozillaProfileResolver {
    home: Option<PathBuf>,
    fallback: Option<PathBuf>,
}

impl MozillaProfileResolver {
    /// System-wide fallback used when no profile matches.
    pub const SYSTEM_FALLBACK: &'static str = "/etc/pki/nssdb";

    /// Resolver rooted at `$HOME`.
    pub fn from_env() -> Self {
        Self {
            home: std::env::var_os("HOME").map(PathBuf::from),
            fallback: Some(PathBuf::from(Self::SYSTEM_FALLBACK)),
        }
    }

    /// Resolver rooted at an explicit home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            fallback: Some(PathBuf::from(Self::SYSTEM_FALLBACK)),
        }
    }

    /// Replace the fallback directory (None disables it).
    pub fn with_fallback(mut self, fallback: Option<PathBuf>) -> Self {
        self.fallback = fallback;
        self
    }

    fn find_profile(&self) -> Option<PathBuf> {
        let profiles = self.home.as_ref()?.join(".mozilla").join("firefox");
        let entries = std::fs::read_dir(&profiles).ok()?;

        // read_dir order is unspecified
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.contains("default"))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        matches.into_iter().next()
    }
}

impl Default for MozillaProfileResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DefaultStoreResolver for MozillaProfileResolver {
    fn resolve_default_store(&self) -> Option<PathBuf> {
        if let Some(profile) = self.find_profile() {
            log::debug!("Using Firefox profile {}", profile.display());
            return Some(profile);
        }
        self.fallback.clone().filter(|path| path.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert_der(name: &str) -> Vec<u8> {
        rcgen::generate_simple_self_signed(vec![name.to_string()])
            .unwrap()
            .cert
            .der()
            .to_vec()
    }

    #[test]
    fn test_add_anchor_der_and_contains() {
        let der = cert_der("root.test");
        let mut store = TrustStore::new();
        assert!(store.is_empty());

        store.add_anchor_der(&der).unwrap();
        store.add_anchor_der(&der).unwrap();
        assert_eq!(store.len(), 1);

        let cert = Certificate::from_der(&der).unwrap();
        assert!(store.contains(&cert));
    }

    #[test]
    fn test_add_anchors_pem() {
        let a = rcgen::generate_simple_self_signed(vec!["a.test".to_string()]).unwrap();
        let b = rcgen::generate_simple_self_signed(vec!["b.test".to_string()]).unwrap();
        let pem = format!("{}{}", a.cert.pem(), b.cert.pem());

        let mut store = TrustStore::new();
        assert_eq!(store.add_anchors_pem(pem.as_bytes()).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_no_default_store() {
        assert!(NoDefaultStore.resolve_default_store().is_none());
        let store = TrustStore::from_resolver(&NoDefaultStore).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mozilla_resolver_finds_default_profile() {
        let home = tempfile::tempdir().unwrap();
        let firefox = home.path().join(".mozilla").join("firefox");
        std::fs::create_dir_all(firefox.join("abcd.release")).unwrap();
        std::fs::create_dir_all(firefox.join("x1y2.default-release")).unwrap();

        let resolver = MozillaProfileResolver::with_home(home.path()).with_fallback(None);
        assert_eq!(
            resolver.resolve_default_store(),
            Some(firefox.join("x1y2.default-release"))
        );
    }

    #[test]
    fn test_mozilla_resolver_fallback() {
        let home = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();

        let resolver = MozillaProfileResolver::with_home(home.path())
            .with_fallback(Some(fallback.path().to_path_buf()));
        assert_eq!(resolver.resolve_default_store(), Some(fallback.path().to_path_buf()));

        let resolver = MozillaProfileResolver::with_home(home.path()).with_fallback(None);
        assert!(resolver.resolve_default_store().is_none());
    }

    #[test]
    fn test_nss_profile_yields_no_anchors() {
        let home = tempfile::tempdir().unwrap();
        let profile = home.path().join(".mozilla").join("firefox").join("q9.default");
        std::fs::create_dir_all(&profile).unwrap();
        std::fs::write(profile.join("cert9.db"), b"SQLite format 3\0").unwrap();
        std::fs::write(profile.join("key4.db"), b"SQLite format 3\0").unwrap();

        let resolver = MozillaProfileResolver::with_home(home.path()).with_fallback(None);
        assert_eq!(resolver.resolve_default_store(), Some(profile.clone()));
        assert!(TrustStore::from_resolver(&resolver).unwrap().is_empty());

        // Roots exported beside the database are picked up
        let root = rcgen::generate_simple_self_signed(vec!["nss-root.test".to_string()]).unwrap();
        std::fs::write(profile.join("roots.pem"), root.cert.pem()).unwrap();
        assert_eq!(TrustStore::from_resolver(&resolver).unwrap().len(), 1);
    }
}
