// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::new_without_default)]
#![allow(clippy::enum_variant_names)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![warn(missing_docs)]

//! # CMS Oxide
//!
//! Verification of CMS / PKCS#7 signed-data messages, as embedded in signed
//! documents.
//!
//! ## Core Features
//!
//! - **Signed-Data Parsing**: DER decoding of the ContentInfo envelope with
//!   tolerance for zero-filled signature containers
//! - **Signature Verification**: messageDigest comparison and RSA / ECDSA
//!   verification over the signed attributes
//! - **Certificate Trust**: chain building against a trust store, validity,
//!   basic constraints, key usage and pluggable revocation
//! - **Stable Verdicts**: fine-grained results narrowed to public
//!   [`SignatureValidationStatus`] and [`CertificateValidationStatus`] values
//!
//! ## Architecture
//! - **Explicit Backend**: [`backend::CryptoContext`] owns the trust anchors and
//!   the temporary certificates registered by messages
//! - **Borrowed Views**: signers and their certificates are looked up on demand
//!   and never copied into the message
//!
//! ## Quick Start
//!
//! ```ignore
//! use cms_oxide::backend::{CryptoContext, TrustStore};
//! use cms_oxide::config::VerifyOptions;
//! use cms_oxide::signatures::verify_detached;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = TrustStore::new();
//! store.add_anchors_pem(&std::fs::read("roots.pem")?)?;
//! let ctx = CryptoContext::initialize(store, VerifyOptions::default())?;
//!
//! let record = verify_detached(&ctx, &signature, &document_bytes);
//! println!("{:?} / {:?}", record.signature_status(), record.certificate_status());
//!
//! ctx.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

// Error handling
pub mod error;

// Configuration
pub mod config;

// Algorithms
pub mod digest;
pub mod oids;

// Certificate backend
pub mod backend;

// Signature verification
pub mod signatures;

// Re-exports
pub use backend::{CryptoContext, TrustStore};
pub use config::VerifyOptions;
pub use digest::DigestAlgorithm;
pub use error::{Error, Result};
pub use signatures::{
    verify_detached, CertificateValidationStatus, SignatureHandler, SignatureRecord,
    SignatureValidationStatus, SignedMessage,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is populated from CARGO_PKG_VERSION at compile time
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "cms_oxide");
    }
}
