//! Detached signature verification for one signer.
//!
//! ## Flow
//!
//! 1. Resolve the digest length of the declared digest algorithm
//! 2. Digest the signed content
//! 3. Resolve the signing certificate
//! 4. With signed attributes, compare `messageDigest` and verify the
//!    signature over the DER SET OF attributes; otherwise verify it over the
//!    content digest
//!
//! Every outcome is also recorded on the signer entry.

use super::crypto::{self, CryptoFailure};
use super::message::SignerEntry;
use super::status::CmsVerificationStatus;
use crate::digest::{self, DigestAlgorithm};

/// Checks a signer's signature against externally supplied content.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create a verifier.
    pub fn new() -> Self {
        Self
    }

    /// Verify `entry` over `content` and record the result on the entry.
    pub fn verify(&self, entry: &SignerEntry<'_>, content: &[u8]) -> CmsVerificationStatus {
        let status = check(entry, content);
        entry.set_status(status);
        if status.is_good() {
            log::debug!("Signature verified");
        } else {
            log::warn!("Signature verification failed: {:?}", status);
        }
        status
    }
}

fn check(entry: &SignerEntry<'_>, content: &[u8]) -> CmsVerificationStatus {
    let digest_oid = entry.digest_algorithm_oid();
    let Ok(digest_len) = digest::digest_length(&digest_oid) else {
        log::warn!("Unrecognized digest algorithm {}", digest_oid);
        return CmsVerificationStatus::SignatureAlgorithmUnknown;
    };
    let Ok(digest_alg) = DigestAlgorithm::from_oid(&digest_oid) else {
        return CmsVerificationStatus::SignatureAlgorithmUnknown;
    };
    let content_digest = digest_alg.compute(content);

    let Some(cert) = entry.signer_certificate() else {
        log::warn!("Signing certificate not found");
        return CmsVerificationStatus::SigningCertNotFound;
    };

    if let Err(failure) = crypto::check_signature_algorithm(&entry.signature_algorithm_oid()) {
        return failure_status(failure);
    }

    let signed_digest = if entry.has_signed_attributes() {
        let declared = match entry.message_digest() {
            Ok(Some(declared)) => declared,
            Ok(None) => {
                log::warn!("Signed attributes lack a messageDigest");
                return CmsVerificationStatus::MalformedSignature;
            },
            Err(e) => {
                log::warn!("{}", e);
                return CmsVerificationStatus::MalformedSignature;
            },
        };
        if declared.len() != digest_len || !crypto::constant_time_eq(&declared, &content_digest) {
            return CmsVerificationStatus::DigestMismatch;
        }

        match entry.signed_attributes_der() {
            Ok(Some(attrs)) => digest_alg.compute(&attrs),
            Ok(None) => return CmsVerificationStatus::MalformedSignature,
            Err(e) => {
                log::warn!("{}", e);
                return CmsVerificationStatus::MalformedSignature;
            },
        }
    } else {
        content_digest
    };

    match crypto::verify_digest_signature(
        cert.spki_der(),
        digest_alg,
        &signed_digest,
        entry.signature_value(),
    ) {
        Ok(()) => CmsVerificationStatus::GoodSignature,
        Err(failure) => failure_status(failure),
    }
}

fn failure_status(failure: CryptoFailure) -> CmsVerificationStatus {
    log::debug!("Signature check failed: {}", failure);
    match failure {
        CryptoFailure::Mismatch => CmsVerificationStatus::BadSignature,
        CryptoFailure::UnknownAlgorithm(_) => CmsVerificationStatus::SignatureAlgorithmUnknown,
        CryptoFailure::UnsupportedAlgorithm(_) => {
            CmsVerificationStatus::SignatureAlgorithmUnsupported
        },
        CryptoFailure::Processing(_) => CmsVerificationStatus::ProcessingError,
    }
}
