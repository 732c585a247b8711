//! Parsed CMS signed-data messages.
//!
//! [`SignedMessage`] owns the decoded structure and the certificates
//! materialized from it. [`SignerEntry`] is a borrowed view of one signer;
//! it resolves the signing certificate on demand and never owns it.

use super::ber;
use super::chain::MaterializedCertificateSet;
use super::status::CmsVerificationStatus;
use crate::backend::{Certificate, CryptoContext};
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::oids;
use chrono::{DateTime, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode, Reader, SliceReader};
use std::cell::Cell;
use std::sync::Arc;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;

/// A parsed signed-data message.
pub struct SignedMessage<'ctx> {
    ctx: &'ctx CryptoContext,
    signed_data: SignedData,
    statuses: Vec<Cell<CmsVerificationStatus>>,
    certificates: MaterializedCertificateSet<'ctx>,
}

impl<'ctx> SignedMessage<'ctx> {
    /// Parse raw signature bytes.
    ///
    /// Fails with [`Error::MalformedEncoding`] when the bytes do not decode
    /// and with [`Error::NotSigned`] when they decode to something other than
    /// signed-data with at least one signer. On success the embedded
    /// certificates are registered with `ctx` until the message is dropped.
    pub fn parse(ctx: &'ctx CryptoContext, raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::MalformedEncoding("empty input".to_string()));
        }

        let content_info = decode_content_info(raw, ctx.options().allow_trailing_padding)?;
        if content_info.content_type != oids::ID_SIGNED_DATA {
            return Err(Error::NotSigned(format!(
                "content type is {}",
                content_info.content_type
            )));
        }

        let signed_data: SignedData = content_info
            .content
            .decode_as()
            .map_err(|e| Error::MalformedEncoding(format!("signed-data: {e}")))?;

        let signer_count = signed_data.signer_infos.0.len();
        if signer_count == 0 {
            return Err(Error::NotSigned("signed-data has no signer information".to_string()));
        }
        if signer_count > 1 {
            log::debug!("Message has {} signers, using the first", signer_count);
        }

        let certificates = MaterializedCertificateSet::materialize(ctx, &signed_data);
        let statuses = (0..signer_count)
            .map(|_| Cell::new(CmsVerificationStatus::Unverified))
            .collect();

        Ok(Self {
            ctx,
            signed_data,
            statuses,
            certificates,
        })
    }

    /// The context this message registered its certificates with.
    pub fn context(&self) -> &'ctx CryptoContext {
        self.ctx
    }

    /// Decoded signed-data structure.
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// First signer. Messages with several signers are not disambiguated.
    pub fn signer(&self) -> Option<SignerEntry<'_>> {
        self.signers().next()
    }

    /// All signers, in encoded order.
    pub fn signers<'a>(&'a self) -> impl Iterator<Item = SignerEntry<'a>> + 'a {
        let message: &'a SignedMessage<'a> = self;
        message
            .signed_data
            .signer_infos
            .0
            .iter()
            .zip(message.statuses.iter())
            .map(move |(info, status)| SignerEntry {
                message,
                info,
                status,
            })
    }

    /// Number of signers.
    pub fn signer_count(&self) -> usize {
        self.statuses.len()
    }

    /// Embedded certificate entries as they appear in the message.
    pub fn raw_certificates(&self) -> impl Iterator<Item = &CertificateChoices> + '_ {
        self.signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
    }

    /// Certificates materialized from the embedded entries.
    pub fn certificates(&self) -> &MaterializedCertificateSet<'ctx> {
        &self.certificates
    }

    /// Content carried inside the message, for enveloping signatures.
    pub fn encapsulated_content(&self) -> Option<Vec<u8>> {
        let econtent = self.signed_data.encap_content_info.econtent.as_ref()?;
        match econtent.decode_as::<OctetString>() {
            Ok(octets) => Some(octets.as_bytes().to_vec()),
            Err(e) => {
                log::warn!("Encapsulated content is not an OCTET STRING: {}", e);
                None
            },
        }
    }
}

impl std::fmt::Debug for SignedMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedMessage")
            .field("signers", &self.statuses.len())
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// Borrowed view of one signer.
#[derive(Clone, Copy)]
pub struct SignerEntry<'m> {
    message: &'m SignedMessage<'m>,
    info: &'m SignerInfo,
    status: &'m Cell<CmsVerificationStatus>,
}

impl<'m> SignerEntry<'m> {
    /// Decoded SignerInfo.
    pub fn info(&self) -> &'m SignerInfo {
        self.info
    }

    /// Parent message.
    pub fn message(&self) -> &'m SignedMessage<'m> {
        self.message
    }

    /// Context of the parent message.
    pub fn context(&self) -> &'m CryptoContext {
        self.message.ctx
    }

    /// Last recorded verification status.
    pub fn status(&self) -> CmsVerificationStatus {
        self.status.get()
    }

    pub(crate) fn set_status(&self, status: CmsVerificationStatus) {
        self.status.set(status);
    }

    /// Declared digest algorithm OID.
    pub fn digest_algorithm_oid(&self) -> ObjectIdentifier {
        self.info.digest_alg.oid
    }

    /// Declared digest algorithm, if supported.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_oid(&self.info.digest_alg.oid).ok()
    }

    /// Declared signature algorithm OID.
    pub fn signature_algorithm_oid(&self) -> ObjectIdentifier {
        self.info.signature_algorithm.oid
    }

    /// Signature value.
    pub fn signature_value(&self) -> &'m [u8] {
        self.info.signature.as_bytes()
    }

    /// Whether signed attributes are present.
    pub fn has_signed_attributes(&self) -> bool {
        self.info.signed_attrs.is_some()
    }

    /// Signed attribute with the given type.
    pub fn signed_attribute(&self, oid: &ObjectIdentifier) -> Option<&'m Attribute> {
        self.info
            .signed_attrs
            .as_ref()?
            .iter()
            .find(|attr| attr.oid == *oid)
    }

    /// DER encoding of the signed attributes as a SET OF, the bytes the
    /// signature covers when attributes are present.
    pub fn signed_attributes_der(&self) -> Result<Option<Vec<u8>>> {
        match &self.info.signed_attrs {
            Some(attrs) => attrs
                .to_der()
                .map(Some)
                .map_err(|e| Error::MalformedEncoding(format!("signed attributes: {e}"))),
            None => Ok(None),
        }
    }

    /// Value of the messageDigest attribute, if present.
    pub fn message_digest(&self) -> Result<Option<Vec<u8>>> {
        let Some(attr) = self.signed_attribute(&oids::ID_MESSAGE_DIGEST) else {
            return Ok(None);
        };

        let mut values = attr.values.iter();
        let (Some(value), None) = (values.next(), values.next()) else {
            return Err(Error::MalformedEncoding(
                "messageDigest must have exactly one value".to_string(),
            ));
        };

        let octets = value
            .decode_as::<OctetString>()
            .map_err(|e| Error::MalformedEncoding(format!("messageDigest: {e}")))?;
        Ok(Some(octets.as_bytes().to_vec()))
    }

    /// Value of the signingTime attribute, if present and decodable.
    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        let attr = self.signed_attribute(&oids::ID_SIGNING_TIME)?;
        let value = attr.values.iter().next()?;

        let time = value
            .to_der()
            .ok()
            .and_then(|der| Time::from_der(&der).ok());
        let Some(time) = time else {
            log::warn!("Ignoring undecodable signingTime attribute");
            return None;
        };

        let secs = i64::try_from(time.to_unix_duration().as_secs()).ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }

    /// Resolve the signing certificate: embedded certificates first, then
    /// the context (temporary entries and trust anchors).
    pub fn signer_certificate(&self) -> Option<Arc<Certificate>> {
        let sid = &self.info.sid;
        self.message
            .certificates
            .find(|cert| identifies(sid, cert))
            .or_else(|| self.message.ctx.find_certificate(|cert| identifies(sid, cert)))
    }
}

impl std::fmt::Debug for SignerEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerEntry")
            .field("digest_algorithm", &self.digest_algorithm_oid())
            .field("signature_algorithm", &self.signature_algorithm_oid())
            .field("status", &self.status())
            .finish()
    }
}

/// Whether `cert` is the certificate named by a signer identifier.
fn identifies(sid: &SignerIdentifier, cert: &Certificate) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => {
            isn.serial_number.as_bytes() == cert.serial()
                && isn
                    .issuer
                    .to_der()
                    .map(|issuer| issuer == cert.issuer_raw())
                    .unwrap_or(false)
        },
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            cert.subject_key_id() == Some(ski.0.as_bytes())
        },
    }
}

/// Decode the outer ContentInfo, tolerating zero padding after it.
///
/// DER is tried first. Input that only decodes as BER is re-encoded to DER
/// and decoded again.
fn decode_content_info(raw: &[u8], allow_padding: bool) -> Result<ContentInfo> {
    let (content_info, consumed) = match decode_der(raw) {
        Ok(decoded) => decoded,
        Err(der_err) => match decode_ber(raw) {
            Some(decoded) => decoded,
            None => return Err(der_err),
        },
    };

    let trailing = &raw[consumed..];
    if !trailing.is_empty() {
        if !allow_padding || trailing.iter().any(|b| *b != 0) {
            return Err(Error::MalformedEncoding(format!(
                "{} trailing bytes after content info",
                trailing.len()
            )));
        }
        log::debug!("Ignoring {} bytes of zero padding", trailing.len());
    }

    Ok(content_info)
}

fn decode_ber(raw: &[u8]) -> Option<(ContentInfo, usize)> {
    let (normalized, consumed) = ber::to_der(raw).ok()?;
    let content_info = ContentInfo::from_der(&normalized).ok()?;
    log::debug!("Re-encoded {consumed} bytes of BER input as DER");
    Some((content_info, consumed))
}

fn decode_der(raw: &[u8]) -> Result<(ContentInfo, usize)> {
    let mut reader =
        SliceReader::new(raw).map_err(|e| Error::MalformedEncoding(format!("input: {e}")))?;
    let content_info = ContentInfo::decode(&mut reader)
        .map_err(|e| Error::MalformedEncoding(format!("content info: {e}")))?;
    let consumed = usize::try_from(reader.position())
        .map_err(|e| Error::MalformedEncoding(format!("content info length: {e}")))?;
    Ok((content_info, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrustStore;
    use crate::config::VerifyOptions;
    use der::Any;

    fn context(options: VerifyOptions) -> CryptoContext {
        CryptoContext::initialize(TrustStore::new(), options).unwrap()
    }

    fn content_info(content_type: ObjectIdentifier, content: Any) -> Vec<u8> {
        ContentInfo {
            content_type,
            content,
        }
        .to_der()
        .unwrap()
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let ctx = context(VerifyOptions::default());
        let err = SignedMessage::parse(&ctx, &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let ctx = context(VerifyOptions::default());
        let err = SignedMessage::parse(&ctx, b"definitely not DER").unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding(_)));
    }

    #[test]
    fn test_data_content_is_not_signed() {
        let ctx = context(VerifyOptions::default());
        let octets = OctetString::new(b"hello".to_vec()).unwrap();
        let raw = content_info(oids::ID_DATA, Any::encode_from(&octets).unwrap());

        let err = SignedMessage::parse(&ctx, &raw).unwrap_err();
        assert!(matches!(err, Error::NotSigned(_)));
    }

    #[test]
    fn test_signed_data_oid_with_garbage_content_is_malformed() {
        let ctx = context(VerifyOptions::default());
        let octets = OctetString::new(b"not signed data".to_vec()).unwrap();
        let raw = content_info(oids::ID_SIGNED_DATA, Any::encode_from(&octets).unwrap());

        let err = SignedMessage::parse(&ctx, &raw).unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding(_)));
    }

    #[test]
    fn test_padding_handling() {
        let octets = OctetString::new(b"x".to_vec()).unwrap();
        let mut raw = content_info(oids::ID_DATA, Any::encode_from(&octets).unwrap());
        raw.extend_from_slice(&[0u8; 64]);

        // Padding is skipped, so the content type check is reached
        let lenient = context(VerifyOptions::lenient());
        assert!(matches!(
            SignedMessage::parse(&lenient, &raw),
            Err(Error::NotSigned(_))
        ));

        let strict = context(VerifyOptions::strict());
        assert!(matches!(
            SignedMessage::parse(&strict, &raw),
            Err(Error::MalformedEncoding(_))
        ));

        raw.push(0x01);
        assert!(matches!(
            SignedMessage::parse(&lenient, &raw),
            Err(Error::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_indefinite_length_content_info() {
        let octets = OctetString::new(b"ber".to_vec()).unwrap();
        let der = content_info(oids::ID_DATA, Any::encode_from(&octets).unwrap());
        // Outer SEQUENCE has a short-form length; swap it for 0x80 and an EOC
        assert!(der[1] < 0x80);
        let mut raw = vec![0x30, 0x80];
        raw.extend_from_slice(&der[2..]);
        raw.extend_from_slice(&[0x00, 0x00]);

        let decoded = decode_content_info(&raw, false).unwrap();
        assert_eq!(decoded.content_type, oids::ID_DATA);
        assert_eq!(decoded.to_der().unwrap(), der);

        raw.extend_from_slice(&[0u8; 8]);
        assert!(decode_content_info(&raw, true).is_ok());
        assert!(matches!(
            decode_content_info(&raw, false),
            Err(Error::MalformedEncoding(_))
        ));
    }
}
