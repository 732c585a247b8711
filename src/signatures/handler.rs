//! Verification orchestration.
//!
//! [`SignatureHandler`] keeps going after a parse failure so callers still
//! get a record: the signature verdict becomes a generic error and the
//! certificate verdict stays "not verified".

use super::message::{SignedMessage, SignerEntry};
use super::status::{
    translate_certificate, translate_signature, CertificateValidationStatus,
    CmsVerificationStatus, SignatureValidationStatus, TrustOutcome,
};
use super::trust::CertificateTrustEvaluator;
use super::types::SignatureRecord;
use super::verifier::SignatureVerifier;
use crate::backend::{Certificate, CryptoContext, TrustStore};
use crate::config::VerifyOptions;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One signature under verification.
#[derive(Debug)]
pub struct SignatureHandler<'ctx> {
    message: Result<SignedMessage<'ctx>>,
    signature_status: Option<CmsVerificationStatus>,
    trust_outcome: Option<TrustOutcome>,
}

impl<'ctx> SignatureHandler<'ctx> {
    /// Parse `raw`. Never fails; see [`SignatureHandler::parse_error`].
    pub fn new(ctx: &'ctx CryptoContext, raw: &[u8]) -> Self {
        let message = SignedMessage::parse(ctx, raw);
        if let Err(e) = &message {
            log::warn!("Could not parse signature: {}", e);
        }
        Self {
            message,
            signature_status: None,
            trust_outcome: None,
        }
    }

    /// Wrap an already parsed message.
    pub fn from_message(message: SignedMessage<'ctx>) -> Self {
        Self {
            message: Ok(message),
            signature_status: None,
            trust_outcome: None,
        }
    }

    /// Parsed message, if parsing succeeded.
    pub fn message(&self) -> Option<&SignedMessage<'ctx>> {
        self.message.as_ref().ok()
    }

    /// Why parsing failed, if it did.
    pub fn parse_error(&self) -> Option<&Error> {
        self.message.as_ref().err()
    }

    /// First signer of the parsed message.
    pub fn signer(&self) -> Option<SignerEntry<'_>> {
        self.message()?.signer()
    }

    fn signer_certificate(&self) -> Option<Arc<Certificate>> {
        self.signer()?.signer_certificate()
    }

    /// Verify the signature over detached `content`.
    pub fn validate_signature(&mut self, content: &[u8]) -> CmsVerificationStatus {
        let status = match self.signer() {
            Some(entry) => SignatureVerifier::new().verify(&entry, content),
            None => CmsVerificationStatus::MalformedSignature,
        };
        self.signature_status = Some(status);
        status
    }

    /// Verify the signature over the content carried inside the message.
    pub fn validate_enveloped_signature(&mut self) -> CmsVerificationStatus {
        match self.message().map(|m| m.encapsulated_content()) {
            Some(Some(content)) => self.validate_signature(&content),
            Some(None) => {
                log::warn!("Message has no encapsulated content");
                self.signature_status = Some(CmsVerificationStatus::MalformedSignature);
                CmsVerificationStatus::MalformedSignature
            },
            None => self.validate_signature(&[]),
        }
    }

    /// Evaluate trust in the signer certificate.
    pub fn validate_certificate(&mut self) -> TrustOutcome {
        let outcome = CertificateTrustEvaluator::new().evaluate(self.signer().as_ref());
        self.trust_outcome = Some(outcome.clone());
        outcome
    }

    /// Common name of the signer certificate.
    pub fn signer_name(&self) -> Option<String> {
        self.signer_certificate()?.common_name().map(str::to_string)
    }

    /// Subject DN of the signer certificate.
    pub fn subject_dn(&self) -> Option<String> {
        self.signer_certificate().map(|cert| cert.subject().to_string())
    }

    /// Claimed signing time from the signed attributes.
    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        self.signer()?.signing_time()
    }

    /// Digest algorithm of the signer, `None` when unknown.
    pub fn hash_algorithm(&self) -> Option<DigestAlgorithm> {
        self.signer()?.digest_algorithm()
    }

    /// Validity window of the signer certificate.
    pub fn signer_cert_validity(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.signer_certificate()
            .map(|cert| (cert.not_before(), cert.not_after()))
    }

    /// Snapshot verdicts and metadata into an owned record.
    pub fn to_record(&self) -> SignatureRecord {
        let mut record = SignatureRecord::new();

        record.set_signature_status(
            self.signature_status
                .map(translate_signature)
                .unwrap_or(SignatureValidationStatus::NotVerified),
        );
        record.set_certificate_status(
            self.trust_outcome
                .as_ref()
                .map(translate_certificate)
                .unwrap_or(CertificateValidationStatus::NotVerified),
        );

        let cert = self.signer_certificate();
        record.set_signer_name(cert.as_ref().and_then(|c| c.common_name().map(str::to_string)));
        record.set_subject_dn(cert.as_ref().map(|c| c.subject().to_string()));
        record.set_signer_cert_validity(
            cert.as_ref().map(|c| c.not_before()),
            cert.as_ref().map(|c| c.not_after()),
        );
        record.set_signing_time(self.signing_time());
        record.set_hash_algorithm(self.hash_algorithm());
        record
    }
}

/// Parse, verify and evaluate a detached signature in one go.
pub fn verify_detached(ctx: &CryptoContext, raw: &[u8], content: &[u8]) -> SignatureRecord {
    let mut handler = SignatureHandler::new(ctx, raw);
    handler.validate_signature(content);
    handler.validate_certificate();
    handler.to_record()
}

/// Run [`verify_detached`] inside its own backend lifetime.
///
/// Only initialization errors are returned. A failed teardown is logged and
/// does not change the record.
pub fn verify_with_fresh_context(
    store: TrustStore,
    options: VerifyOptions,
    raw: &[u8],
    content: &[u8],
) -> Result<SignatureRecord> {
    let ctx = CryptoContext::initialize(store, options)?;
    let record = verify_detached(&ctx, raw, content);
    if let Err(e) = ctx.shutdown() {
        log::error!("Crypto backend teardown failed after verification: {}", e);
    }
    Ok(record)
}
