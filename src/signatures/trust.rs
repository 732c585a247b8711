//! Signer certificate trust evaluation.
//!
//! Path validation walks from the signer certificate towards a trust anchor,
//! looking issuers up by subject name among the anchors and the temporary
//! certificates registered with the context. Each hop checks the issuer's
//! signature, validity, CA flag and revocation status.

use super::crypto;
use super::message::SignerEntry;
use super::status::{CmsVerificationStatus, TrustErrorCode, TrustOutcome, TrustWarning};
use crate::backend::{Certificate, CryptoContext, RevocationStatus};
use crate::config::{CertificateUsage, RevocationPolicy};
use std::sync::Arc;

/// Decides whether a signer certificate chains to a trust anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateTrustEvaluator;

impl CertificateTrustEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the signer's certificate.
    ///
    /// `None` (no parsed signer) yields [`TrustOutcome::NotApplicable`].
    pub fn evaluate(&self, entry: Option<&SignerEntry<'_>>) -> TrustOutcome {
        let Some(entry) = entry else {
            return TrustOutcome::NotApplicable;
        };

        let Some(cert) = entry.signer_certificate() else {
            log::warn!("Signing certificate not found");
            entry.set_status(CmsVerificationStatus::SigningCertNotFound);
            return TrustOutcome::Failed(TrustErrorCode::SigningCertNotFound);
        };

        self.evaluate_certificate(entry.context(), &cert)
    }

    /// Evaluate an arbitrary certificate against the context's anchors.
    pub fn evaluate_certificate(&self, ctx: &CryptoContext, cert: &Arc<Certificate>) -> TrustOutcome {
        match validate_path(ctx, cert) {
            Ok(warnings) => {
                for warning in &warnings {
                    log::warn!("{:?}", warning);
                }
                log::debug!("Certificate {} is trusted", cert.subject());
                TrustOutcome::Trusted { warnings }
            },
            Err(code) => {
                log::warn!("Certificate {} is not trusted: {:?}", cert.subject(), code);
                TrustOutcome::Failed(code)
            },
        }
    }
}

fn validate_path(
    ctx: &CryptoContext,
    leaf: &Arc<Certificate>,
) -> Result<Vec<TrustWarning>, TrustErrorCode> {
    let options = ctx.options();
    let time = options.effective_time();

    if !leaf.is_valid_at(time) {
        return Err(TrustErrorCode::ExpiredCertificate);
    }
    if !usage_allowed(leaf, options.usage) {
        return Err(TrustErrorCode::InadequateKeyUsage);
    }

    let mut warnings = Vec::new();
    let mut current = Arc::clone(leaf);
    let mut hops = 0;

    loop {
        if ctx.is_trust_anchor(&current) {
            return Ok(warnings);
        }
        if hops >= options.max_chain_depth {
            return Err(TrustErrorCode::PathTooLong);
        }

        let candidates: Vec<Arc<Certificate>> = ctx
            .find_by_subject(current.issuer_raw())
            .into_iter()
            .filter(|candidate| **candidate != *current)
            .collect();
        if candidates.is_empty() {
            return Err(if current.is_self_issued() {
                TrustErrorCode::UntrustedIssuer
            } else {
                TrustErrorCode::UnknownIssuer
            });
        }

        let issuer = candidates
            .into_iter()
            .find(|candidate| crypto::verify_certificate_signature(candidate, &current).is_ok())
            .ok_or(TrustErrorCode::BadCertificateSignature)?;

        if !issuer.is_valid_at(time) {
            return Err(TrustErrorCode::ExpiredIssuerCertificate);
        }
        let can_sign_certs = issuer.key_usage().map_or(true, |ku| ku.key_cert_sign);
        if !issuer.is_ca() || !can_sign_certs {
            return Err(TrustErrorCode::CaCertInvalid);
        }

        if options.revocation_policy != RevocationPolicy::Disabled {
            match ctx.revocation_checker().check(&current, &issuer) {
                RevocationStatus::Good => {},
                RevocationStatus::Revoked => return Err(TrustErrorCode::RevokedCertificate),
                RevocationStatus::Unavailable(reason) => {
                    if options.revocation_policy == RevocationPolicy::HardFail {
                        return Err(TrustErrorCode::RevocationUnavailable);
                    }
                    warnings.push(TrustWarning::RevocationUnconfirmed {
                        subject: current.subject().to_string(),
                        reason,
                    });
                },
            }
        }

        current = issuer;
        hops += 1;
    }
}

fn usage_allowed(cert: &Certificate, usage: CertificateUsage) -> bool {
    match usage {
        CertificateUsage::Any => true,
        CertificateUsage::EmailSigner => {
            let ku_ok = cert
                .key_usage()
                .map_or(true, |ku| ku.digital_signature || ku.non_repudiation);
            let eku_ok = cert
                .extended_key_usage()
                .map_or(true, |eku| eku.any || eku.email_protection);
            ku_ok && eku_ok
        },
    }
}
