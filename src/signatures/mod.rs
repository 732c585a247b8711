//! CMS signed-data verification.
//!
//! This module verifies detached PKCS#7 / CMS signatures of the kind embedded
//! in signed documents, and evaluates trust in the signer certificate.
//!
//! ## Features
//!
//! - **Message Parsing**: Decode DER or BER signed-data, tolerate container zero padding
//! - **Signature Verification**: RSA PKCS#1 v1.5 and ECDSA P-256/P-384, with or
//!   without signed attributes
//! - **Certificate Trust**: Path validation to a trust anchor with revocation
//!   policy and usage profile
//! - **Status Translation**: Fine-grained results narrowed to stable public verdicts
//!
//! ## Example
//!
//! ```ignore
//! use cms_oxide::backend::{CryptoContext, TrustStore};
//! use cms_oxide::config::VerifyOptions;
//! use cms_oxide::signatures::verify_detached;
//!
//! let mut store = TrustStore::new();
//! store.load_directory("/etc/ssl/certs")?;
//! let ctx = CryptoContext::initialize(store, VerifyOptions::default())?;
//!
//! let record = verify_detached(&ctx, &signature_bytes, &signed_bytes);
//! println!("{}", record.to_json()?);
//! ```
//!
//! ## Standards Reference
//!
//! - RFC 5652 - Cryptographic Message Syntax
//! - RFC 5280 - X.509 certificate path validation
//! - ETSI TS 102 778 - PAdES

mod ber;
mod chain;
mod crypto;
mod handler;
mod message;
mod status;
mod trust;
mod types;
mod verifier;

pub use chain::MaterializedCertificateSet;
pub use handler::{verify_detached, verify_with_fresh_context, SignatureHandler};
pub use message::{SignedMessage, SignerEntry};
pub use status::{
    translate_certificate, translate_certificate_code, translate_signature,
    translate_signature_code, BackendCode, CertificateValidationStatus, CmsVerificationStatus,
    SignatureValidationStatus, TrustErrorCode, TrustOutcome, TrustWarning,
};
pub use trust::CertificateTrustEvaluator;
pub use types::{SignatureRecord, SignatureSubFilter};
pub use verifier::SignatureVerifier;
