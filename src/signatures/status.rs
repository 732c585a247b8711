//! Verification statuses and their translation to the public enumerations.
//!
//! The verifier and the trust evaluator speak a fine-grained vocabulary
//! ([`CmsVerificationStatus`], [`TrustOutcome`]). Callers get the closed
//! [`SignatureValidationStatus`] and [`CertificateValidationStatus`] sets.
//! Anything without an explicit mapping lands in `GenericError`, never in a
//! success bucket.

use serde::Serialize;
use std::num::NonZeroI32;

/// Fine-grained result of checking one signer's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CmsVerificationStatus {
    /// Not verified yet
    #[default]
    Unverified = 0,
    /// Signature matches the content and the signer key
    GoodSignature = 1,
    /// Signature value does not verify under the signer key
    BadSignature = 2,
    /// messageDigest attribute differs from the content digest
    DigestMismatch = 3,
    /// Signer certificate not found in the message or the trust store
    SigningCertNotFound = 4,
    /// Signer certificate is not trusted
    SigningCertNotTrusted = 5,
    /// Digest or signature algorithm is not recognized
    SignatureAlgorithmUnknown = 6,
    /// Algorithm is recognized but not implemented
    SignatureAlgorithmUnsupported = 7,
    /// Signer information is structurally invalid, or there is no message
    MalformedSignature = 8,
    /// The signer key or signature could not be processed
    ProcessingError = 9,
}

impl CmsVerificationStatus {
    /// All statuses, in code order.
    pub const ALL: [CmsVerificationStatus; 10] = [
        CmsVerificationStatus::Unverified,
        CmsVerificationStatus::GoodSignature,
        CmsVerificationStatus::BadSignature,
        CmsVerificationStatus::DigestMismatch,
        CmsVerificationStatus::SigningCertNotFound,
        CmsVerificationStatus::SigningCertNotTrusted,
        CmsVerificationStatus::SignatureAlgorithmUnknown,
        CmsVerificationStatus::SignatureAlgorithmUnsupported,
        CmsVerificationStatus::MalformedSignature,
        CmsVerificationStatus::ProcessingError,
    ];

    /// Stable numeric code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Status for a numeric code, if it is one of ours.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Whether the signature verified.
    pub fn is_good(self) -> bool {
        self == CmsVerificationStatus::GoodSignature
    }
}

/// Fine-grained reasons path validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustErrorCode {
    /// Chain does not reach a trust anchor
    UnknownIssuer,
    /// Chain ends at a self-issued certificate that is not an anchor
    UntrustedIssuer,
    /// Certificate is revoked
    RevokedCertificate,
    /// Signer certificate is outside its validity window
    ExpiredCertificate,
    /// An issuer certificate is outside its validity window
    ExpiredIssuerCertificate,
    /// Signer certificate does not allow the requested usage
    InadequateKeyUsage,
    /// An issuer is not a CA certificate
    CaCertInvalid,
    /// A certificate signature does not verify under its issuer's key
    BadCertificateSignature,
    /// Chain exceeds the maximum depth
    PathTooLong,
    /// Revocation status required but unavailable
    RevocationUnavailable,
    /// No signer certificate to evaluate
    SigningCertNotFound,
    /// Code from another trust backend, passed through unchanged
    Backend(BackendCode),
}

/// Error code reported by another trust backend.
///
/// Never zero (the trusted code) and never one of the codes the named
/// [`TrustErrorCode`] variants use, so every code maps back to exactly one
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendCode(NonZeroI32);

impl BackendCode {
    /// Wrap `code`, or `None` if it is zero or a named code.
    pub fn new(code: i32) -> Option<Self> {
        if TrustErrorCode::KNOWN.iter().any(|known| known.code() == code) {
            return None;
        }
        NonZeroI32::new(code).map(BackendCode)
    }

    /// The raw code.
    pub fn get(self) -> i32 {
        self.0.get()
    }
}

impl TrustErrorCode {
    const KNOWN: [TrustErrorCode; 11] = [
        TrustErrorCode::UnknownIssuer,
        TrustErrorCode::UntrustedIssuer,
        TrustErrorCode::BadCertificateSignature,
        TrustErrorCode::RevokedCertificate,
        TrustErrorCode::ExpiredCertificate,
        TrustErrorCode::ExpiredIssuerCertificate,
        TrustErrorCode::InadequateKeyUsage,
        TrustErrorCode::CaCertInvalid,
        TrustErrorCode::PathTooLong,
        TrustErrorCode::RevocationUnavailable,
        TrustErrorCode::SigningCertNotFound,
    ];

    /// Stable numeric code. Known codes are never zero.
    pub fn code(self) -> i32 {
        match self {
            TrustErrorCode::UnknownIssuer => 1,
            TrustErrorCode::RevokedCertificate => 2,
            TrustErrorCode::ExpiredCertificate => 3,
            TrustErrorCode::ExpiredIssuerCertificate => 4,
            TrustErrorCode::InadequateKeyUsage => 5,
            TrustErrorCode::CaCertInvalid => 6,
            TrustErrorCode::PathTooLong => 7,
            TrustErrorCode::RevocationUnavailable => 8,
            TrustErrorCode::SigningCertNotFound => 9,
            TrustErrorCode::UntrustedIssuer => 10,
            TrustErrorCode::BadCertificateSignature => 11,
            TrustErrorCode::Backend(code) => code.get(),
        }
    }

    /// Error code for a numeric code; unknown codes become `Backend`.
    ///
    /// Returns `None` for 0, which means trusted rather than an error.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .find(|known| known.code() == code)
            .or_else(|| BackendCode::new(code).map(TrustErrorCode::Backend))
    }
}

/// Non-fatal finding recorded during path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustWarning {
    /// Revocation could not be confirmed for the named certificate
    RevocationUnconfirmed {
        /// Subject of the certificate whose status is unknown
        subject: String,
        /// Why no answer was available
        reason: String,
    },
}

/// Result of certificate trust evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustOutcome {
    /// Chain validated to a trust anchor
    Trusted {
        /// Soft-fail findings; they do not affect the verdict
        warnings: Vec<TrustWarning>,
    },
    /// Path validation failed
    Failed(TrustErrorCode),
    /// There was no parsed signer to evaluate
    NotApplicable,
}

impl TrustOutcome {
    /// Whether the certificate is trusted.
    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustOutcome::Trusted { .. })
    }

    /// Raw numeric code: 0 for trusted, the error code otherwise, None when
    /// not applicable.
    pub fn code(&self) -> Option<i32> {
        match self {
            TrustOutcome::Trusted { .. } => Some(0),
            TrustOutcome::Failed(code) => Some(code.code()),
            TrustOutcome::NotApplicable => None,
        }
    }
}

/// Public signature verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureValidationStatus {
    /// Signature is valid
    Valid,
    /// Signature does not verify
    Invalid,
    /// Content digest does not match
    DigestMismatch,
    /// Signature could not be decoded or processed
    DecodingError,
    /// Any other failure
    GenericError,
    /// Not verified yet
    #[default]
    NotVerified,
}

/// Public certificate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateValidationStatus {
    /// Chains to a trust anchor
    Trusted,
    /// Issuer unknown or not trusted
    Untrusted,
    /// Revoked
    Revoked,
    /// Outside its validity window
    Expired,
    /// Any other failure
    GenericError,
    /// Not verified, or nothing to verify
    #[default]
    NotVerified,
}

/// Narrow a fine-grained signature status.
pub fn translate_signature(status: CmsVerificationStatus) -> SignatureValidationStatus {
    match status {
        CmsVerificationStatus::GoodSignature => SignatureValidationStatus::Valid,
        CmsVerificationStatus::BadSignature => SignatureValidationStatus::Invalid,
        CmsVerificationStatus::DigestMismatch => SignatureValidationStatus::DigestMismatch,
        CmsVerificationStatus::ProcessingError => SignatureValidationStatus::DecodingError,
        _ => SignatureValidationStatus::GenericError,
    }
}

/// Narrow a raw signature status code. Unknown codes map to `GenericError`.
pub fn translate_signature_code(code: u8) -> SignatureValidationStatus {
    CmsVerificationStatus::from_code(code)
        .map(translate_signature)
        .unwrap_or(SignatureValidationStatus::GenericError)
}

/// Narrow a trust outcome.
pub fn translate_certificate(outcome: &TrustOutcome) -> CertificateValidationStatus {
    match outcome {
        TrustOutcome::Trusted { .. } => CertificateValidationStatus::Trusted,
        TrustOutcome::Failed(code) => translate_trust_error(*code),
        TrustOutcome::NotApplicable => CertificateValidationStatus::NotVerified,
    }
}

/// Narrow a raw trust code where 0 means trusted.
pub fn translate_certificate_code(code: i32) -> CertificateValidationStatus {
    match TrustErrorCode::from_code(code) {
        Some(error) => translate_trust_error(error),
        None => CertificateValidationStatus::Trusted,
    }
}

fn translate_trust_error(code: TrustErrorCode) -> CertificateValidationStatus {
    match code {
        TrustErrorCode::UnknownIssuer | TrustErrorCode::UntrustedIssuer => {
            CertificateValidationStatus::Untrusted
        },
        TrustErrorCode::RevokedCertificate => CertificateValidationStatus::Revoked,
        TrustErrorCode::ExpiredCertificate => CertificateValidationStatus::Expired,
        _ => CertificateValidationStatus::GenericError,
    }
}
