//! Signature record types.
//!
//! [`SignatureRecord`] is the caller-facing snapshot of one verification: the
//! two public verdicts plus the signer metadata. It owns all of its data and
//! outlives the message and context it was produced from.

use super::status::{CertificateValidationStatus, SignatureValidationStatus};
use crate::digest::DigestAlgorithm;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Signature sub-filter type (container format the signature came from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SignatureSubFilter {
    /// adbe.pkcs7.detached - PKCS#7 detached signature
    #[default]
    #[serde(rename = "adbe.pkcs7.detached")]
    Pkcs7Detached,
    /// adbe.pkcs7.sha1 - PKCS#7 over a SHA-1 digest
    #[serde(rename = "adbe.pkcs7.sha1")]
    Pkcs7Sha1,
    /// ETSI.CAdES.detached - CAdES signature
    #[serde(rename = "ETSI.CAdES.detached")]
    CadesDetached,
    /// ETSI.RFC3161 - Timestamp token
    #[serde(rename = "ETSI.RFC3161")]
    Rfc3161,
}

impl SignatureSubFilter {
    /// Get the PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::Pkcs7Sha1 => "adbe.pkcs7.sha1",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
            SignatureSubFilter::Rfc3161 => "ETSI.RFC3161",
        }
    }

    /// Parse a PDF name into a sub-filter type.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "adbe.pkcs7.detached" => Some(SignatureSubFilter::Pkcs7Detached),
            "adbe.pkcs7.sha1" => Some(SignatureSubFilter::Pkcs7Sha1),
            "ETSI.CAdES.detached" => Some(SignatureSubFilter::CadesDetached),
            "ETSI.RFC3161" => Some(SignatureSubFilter::Rfc3161),
            _ => None,
        }
    }

    /// Whether signed-data verification applies to this format.
    ///
    /// Timestamp tokens are signed-data too, but they sign a TSTInfo rather
    /// than the document bytes.
    pub fn is_supported(&self) -> bool {
        !matches!(self, SignatureSubFilter::Rfc3161)
    }
}

/// Snapshot of one signature verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignatureRecord {
    signature_status: SignatureValidationStatus,
    certificate_status: CertificateValidationStatus,
    signer_name: Option<String>,
    subject_dn: Option<String>,
    signing_time: Option<DateTime<Utc>>,
    signer_cert_not_before: Option<DateTime<Utc>>,
    signer_cert_not_after: Option<DateTime<Utc>>,
    hash_algorithm: Option<DigestAlgorithm>,
    sub_filter: Option<SignatureSubFilter>,
}

impl SignatureRecord {
    /// Empty record: nothing verified, no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Public signature verdict.
    pub fn signature_status(&self) -> SignatureValidationStatus {
        self.signature_status
    }

    /// Set the signature verdict.
    pub fn set_signature_status(&mut self, status: SignatureValidationStatus) {
        self.signature_status = status;
    }

    /// Public certificate verdict.
    pub fn certificate_status(&self) -> CertificateValidationStatus {
        self.certificate_status
    }

    /// Set the certificate verdict.
    pub fn set_certificate_status(&mut self, status: CertificateValidationStatus) {
        self.certificate_status = status;
    }

    /// Signer common name.
    pub fn signer_name(&self) -> Option<&str> {
        self.signer_name.as_deref()
    }

    /// Replace the signer name. The previous value is dropped.
    pub fn set_signer_name(&mut self, name: Option<String>) {
        self.signer_name = name;
    }

    /// Signer subject distinguished name.
    pub fn subject_dn(&self) -> Option<&str> {
        self.subject_dn.as_deref()
    }

    /// Replace the subject DN.
    pub fn set_subject_dn(&mut self, dn: Option<String>) {
        self.subject_dn = dn;
    }

    /// Claimed signing time.
    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        self.signing_time
    }

    /// Set the signing time.
    pub fn set_signing_time(&mut self, time: Option<DateTime<Utc>>) {
        self.signing_time = time;
    }

    /// Start of the signer certificate validity window.
    pub fn signer_cert_not_before(&self) -> Option<DateTime<Utc>> {
        self.signer_cert_not_before
    }

    /// End of the signer certificate validity window.
    pub fn signer_cert_not_after(&self) -> Option<DateTime<Utc>> {
        self.signer_cert_not_after
    }

    /// Set the signer certificate validity window.
    pub fn set_signer_cert_validity(
        &mut self,
        not_before: Option<DateTime<Utc>>,
        not_after: Option<DateTime<Utc>>,
    ) {
        self.signer_cert_not_before = not_before;
        self.signer_cert_not_after = not_after;
    }

    /// Digest algorithm of the signer, `None` when unknown.
    pub fn hash_algorithm(&self) -> Option<DigestAlgorithm> {
        self.hash_algorithm
    }

    /// Set the digest algorithm.
    pub fn set_hash_algorithm(&mut self, algorithm: Option<DigestAlgorithm>) {
        self.hash_algorithm = algorithm;
    }

    /// Container sub-filter, when the caller knows it.
    pub fn sub_filter(&self) -> Option<SignatureSubFilter> {
        self.sub_filter
    }

    /// Set the container sub-filter.
    pub fn set_sub_filter(&mut self, sub_filter: Option<SignatureSubFilter>) {
        self.sub_filter = sub_filter;
    }

    /// Whether the sub-filter is one this library verifies. An unset
    /// sub-filter is treated as supported.
    pub fn is_sub_filter_supported(&self) -> bool {
        self.sub_filter.map_or(true, |sf| sf.is_supported())
    }

    /// Serialize the record for reporting.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
