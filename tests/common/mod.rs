//! Shared fixtures for integration tests: rcgen certificates and CMS
//! signed-data assembled from `cms` types, signed with P-256 or RSA.

#![allow(dead_code)]

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
    SignerInfos,
};
use cms_oxide::oids;
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Any, Decode, Encode};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rsa::pkcs8::{DecodePrivateKey as _, EncodePrivateKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use std::time::Duration;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;

/// 2024-05-01T12:00:00Z
pub const SIGNING_TIME: u64 = 1_714_564_800;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A certificate plus its private key.
pub struct Identity {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl Identity {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_pkcs8_der(&self.key.serialize_der()).unwrap()
    }

    /// Sign a SHA-256 prehash, returning the signature and its algorithm.
    pub fn sign_prehash(&self, prehash: &[u8]) -> (Vec<u8>, ObjectIdentifier) {
        let pkcs8 = self.key.serialize_der();
        match RsaPrivateKey::from_pkcs8_der(&pkcs8) {
            Ok(rsa_key) => {
                let signature = rsa_key.sign(Pkcs1v15Sign::new::<Sha256>(), prehash).unwrap();
                (signature, oids::SHA256_WITH_RSA)
            },
            Err(_) => {
                let signature: Signature = self.signing_key().sign_prehash(prehash).unwrap();
                (signature.to_der().as_bytes().to_vec(), oids::ECDSA_WITH_SHA256)
            },
        }
    }

    fn x509(&self) -> x509_cert::Certificate {
        x509_cert::Certificate::from_der(self.cert.der()).unwrap()
    }
}

fn params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![format!("{}.test", cn.to_lowercase().replace(' ', "-"))]).unwrap();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, cn);
    params
}

pub fn self_signed(cn: &str) -> Identity {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn).self_signed(&key).unwrap();
    Identity { cert, key }
}

/// A self-signed certificate over a 2048-bit RSA key.
pub fn rsa_self_signed(cn: &str) -> Identity {
    let rsa_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).unwrap();
    let pem = rsa_key.to_pkcs8_pem(LineEnding::LF).unwrap();
    let key = KeyPair::from_pem(&pem).unwrap();
    assert_eq!(key.algorithm(), &rcgen::PKCS_RSA_SHA256);
    let cert = params(cn).self_signed(&key).unwrap();
    Identity { cert, key }
}

pub fn root_ca(cn: &str) -> Identity {
    let mut params = params(cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Identity { cert, key }
}

pub fn issued_by(cn: &str, issuer: &Identity) -> Identity {
    issued_with(params(cn), issuer)
}

pub fn expired_issued_by(cn: &str, issuer: &Identity) -> Identity {
    let mut params = params(cn);
    params.not_before = rcgen::date_time_ymd(2010, 1, 1);
    params.not_after = rcgen::date_time_ymd(2011, 1, 1);
    issued_with(params, issuer)
}

fn issued_with(params: CertificateParams, issuer: &Identity) -> Identity {
    let key = KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    Identity { cert, key }
}

/// Builds a detached (or enveloping) signed-data message.
pub struct CmsBuilder<'a> {
    signer: &'a Identity,
    digest_algorithm: ObjectIdentifier,
    certificates: Vec<Vec<u8>>,
    signed_attributes: bool,
    message_digest: Option<Vec<u8>>,
    signing_time: Option<u64>,
    corrupt_signature: bool,
    encapsulate: bool,
}

impl<'a> CmsBuilder<'a> {
    pub fn new(signer: &'a Identity) -> Self {
        Self {
            signer,
            digest_algorithm: oids::ID_SHA256,
            certificates: vec![signer.der()],
            signed_attributes: true,
            message_digest: None,
            signing_time: Some(SIGNING_TIME),
            corrupt_signature: false,
            encapsulate: false,
        }
    }

    /// Declare a different digest algorithm. Hashing still uses SHA-256.
    pub fn with_digest_algorithm(mut self, oid: ObjectIdentifier) -> Self {
        self.digest_algorithm = oid;
        self
    }

    pub fn without_certificates(mut self) -> Self {
        self.certificates.clear();
        self
    }

    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.certificates.push(der);
        self
    }

    pub fn without_signed_attributes(mut self) -> Self {
        self.signed_attributes = false;
        self
    }

    pub fn with_message_digest(mut self, digest: Vec<u8>) -> Self {
        self.message_digest = Some(digest);
        self
    }

    pub fn without_signing_time(mut self) -> Self {
        self.signing_time = None;
        self
    }

    pub fn corrupt_signature(mut self) -> Self {
        self.corrupt_signature = true;
        self
    }

    pub fn enveloping(mut self) -> Self {
        self.encapsulate = true;
        self
    }

    pub fn build(&self, content: &[u8]) -> Vec<u8> {
        let digest_alg = AlgorithmIdentifierOwned {
            oid: self.digest_algorithm,
            parameters: None,
        };
        let content_digest = Sha256::digest(content).to_vec();

        let (signed_attrs, to_sign) = if self.signed_attributes {
            let declared = self.message_digest.clone().unwrap_or_else(|| content_digest.clone());
            let mut attrs = vec![
                attribute(oids::ID_CONTENT_TYPE, Any::encode_from(&oids::ID_DATA).unwrap()),
                attribute(
                    oids::ID_MESSAGE_DIGEST,
                    Any::encode_from(&OctetString::new(declared).unwrap()).unwrap(),
                ),
            ];
            if let Some(secs) = self.signing_time {
                let time = Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap());
                attrs.push(attribute(oids::ID_SIGNING_TIME, Any::encode_from(&time).unwrap()));
            }
            let attrs = SetOfVec::try_from(attrs).unwrap();
            let to_sign = Sha256::digest(attrs.to_der().unwrap()).to_vec();
            (Some(attrs), to_sign)
        } else {
            (None, content_digest)
        };

        let (mut signature, signature_oid) = self.signer.sign_prehash(&to_sign);
        if self.corrupt_signature {
            let last = signature.len() - 1;
            signature[last] ^= 0x01;
        }

        let x509 = self.signer.x509();
        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: x509.tbs_certificate.issuer.clone(),
                serial_number: x509.tbs_certificate.serial_number.clone(),
            }),
            digest_alg: digest_alg.clone(),
            signed_attrs,
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: signature_oid,
                parameters: None,
            },
            signature: OctetString::new(signature).unwrap(),
            unsigned_attrs: None,
        };

        let certificates = if self.certificates.is_empty() {
            None
        } else {
            let choices: Vec<CertificateChoices> = self
                .certificates
                .iter()
                .map(|der| CertificateChoices::Certificate(x509_cert::Certificate::from_der(der).unwrap()))
                .collect();
            Some(CertificateSet(SetOfVec::try_from(choices).unwrap()))
        };

        let econtent = self
            .encapsulate
            .then(|| Any::encode_from(&OctetString::new(content.to_vec()).unwrap()).unwrap());

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg]).unwrap(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: oids::ID_DATA,
                econtent,
            },
            certificates,
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).unwrap()),
        };

        ContentInfo {
            content_type: oids::ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data).unwrap(),
        }
        .to_der()
        .unwrap()
    }
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Attribute {
    Attribute {
        oid,
        values: SetOfVec::try_from(vec![value]).unwrap(),
    }
}

/// A ContentInfo wrapping enveloped-data instead of signed-data.
pub fn enveloped_data() -> Vec<u8> {
    ContentInfo {
        content_type: oids::ID_ENVELOPED_DATA,
        content: Any::encode_from(&OctetString::new(b"opaque".to_vec()).unwrap()).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// Re-wrap a DER ContentInfo so its outer SEQUENCE uses indefinite length.
pub fn with_indefinite_outer_length(der: &[u8]) -> Vec<u8> {
    assert_eq!(der[0], 0x30);
    let header = match der[1] {
        len if len < 0x80 => 2,
        len => 2 + usize::from(len & 0x7f),
    };
    let mut ber = vec![0x30, 0x80];
    ber.extend_from_slice(&der[header..]);
    ber.extend_from_slice(&[0x00, 0x00]);
    ber
}
