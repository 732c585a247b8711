//! Owned X.509 certificates.
//!
//! [`Certificate`] copies everything verification needs out of the borrowed
//! `x509-parser` view, so certificates can be shared (`Arc`) between the
//! trust store, the temporary pool and signed messages without lifetimes.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use der::asn1::ObjectIdentifier;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::X509Certificate;

/// Key usage bits relevant to signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsageFlags {
    /// digitalSignature
    pub digital_signature: bool,
    /// nonRepudiation (contentCommitment)
    pub non_repudiation: bool,
    /// keyCertSign
    pub key_cert_sign: bool,
}

/// Extended key usage purposes relevant to signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedKeyUsageFlags {
    /// anyExtendedKeyUsage
    pub any: bool,
    /// emailProtection
    pub email_protection: bool,
    /// codeSigning
    pub code_signing: bool,
}

/// A parsed X.509 certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
    subject: String,
    issuer: String,
    common_name: Option<String>,
    serial: Vec<u8>,
    spki_der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_algorithm: ObjectIdentifier,
    signature: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    is_ca: bool,
    key_usage: Option<KeyUsageFlags>,
    extended_key_usage: Option<ExtendedKeyUsageFlags>,
    subject_key_id: Option<Vec<u8>>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (rest, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| Error::Certificate(format!("invalid certificate DER: {e}")))?;
        if !rest.is_empty() {
            return Err(Error::Certificate(format!(
                "{} trailing bytes after certificate",
                rest.len()
            )));
        }

        Self::from_parsed(der, &cert)
    }

    fn from_parsed(der: &[u8], cert: &X509Certificate<'_>) -> Result<Self> {
        let signature_algorithm =
            ObjectIdentifier::from_bytes(cert.signature_algorithm.algorithm.as_bytes())
                .map_err(|e| Error::Certificate(format!("bad signature algorithm OID: {e}")))?;

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp(), "notBefore")?;
        let not_after = timestamp(validity.not_after.timestamp(), "notAfter")?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        // Duplicate or malformed extensions degrade to "absent"
        let is_ca = matches!(cert.basic_constraints(), Ok(Some(bc)) if bc.value.ca);

        let key_usage = match cert.key_usage() {
            Ok(Some(ku)) => Some(KeyUsageFlags {
                digital_signature: ku.value.digital_signature(),
                non_repudiation: ku.value.non_repudiation(),
                key_cert_sign: ku.value.key_cert_sign(),
            }),
            _ => None,
        };

        let extended_key_usage = match cert.extended_key_usage() {
            Ok(Some(eku)) => Some(ExtendedKeyUsageFlags {
                any: eku.value.any,
                email_protection: eku.value.email_protection,
                code_signing: eku.value.code_signing,
            }),
            _ => None,
        };

        let subject_key_id = cert.extensions().iter().find_map(|ext| {
            if let ParsedExtension::SubjectKeyIdentifier(kid) = ext.parsed_extension() {
                Some(kid.0.to_vec())
            } else {
                None
            }
        });

        Ok(Self {
            der: der.to_vec(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            common_name,
            serial: cert.tbs_certificate.raw_serial().to_vec(),
            spki_der: cert.public_key().raw.to_vec(),
            tbs_der: cert.tbs_certificate.as_ref().to_vec(),
            signature_algorithm,
            signature: cert.signature_value.data.to_vec(),
            not_before,
            not_after,
            is_ca,
            key_usage,
            extended_key_usage,
            subject_key_id,
        })
    }

    /// Full DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER encoding of the subject Name.
    pub fn subject_raw(&self) -> &[u8] {
        &self.subject_raw
    }

    /// DER encoding of the issuer Name.
    pub fn issuer_raw(&self) -> &[u8] {
        &self.issuer_raw
    }

    /// Subject distinguished name (RFC 4514 style).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// First subject common name, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Serial number content octets, as encoded.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER-encoded SubjectPublicKeyInfo.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// DER-encoded TBSCertificate, the bytes the issuer signed.
    pub fn tbs_der(&self) -> &[u8] {
        &self.tbs_der
    }

    /// Algorithm the issuer signed this certificate with.
    pub fn signature_algorithm(&self) -> &ObjectIdentifier {
        &self.signature_algorithm
    }

    /// Issuer signature value.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `time` falls inside the validity window (inclusive).
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.not_before <= time && time <= self.not_after
    }

    /// Basic constraints cA flag.
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Key usage extension, if present.
    pub fn key_usage(&self) -> Option<KeyUsageFlags> {
        self.key_usage
    }

    /// Extended key usage extension, if present.
    pub fn extended_key_usage(&self) -> Option<ExtendedKeyUsageFlags> {
        self.extended_key_usage
    }

    /// Subject key identifier extension, if present.
    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    /// Subject and issuer names are identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Certificate(format!("{field} out of range: {secs}")))
}
