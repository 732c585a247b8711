//! Public-key signature primitives shared by signer and certificate checks.
//!
//! Routing is done on the key type from the SubjectPublicKeyInfo, not on the
//! signature algorithm label: the label tells us which hash was used, the key
//! tells us which scheme to run. All checks operate on a digest that has
//! already been computed (prehash).

use crate::backend::Certificate;
use crate::digest::DigestAlgorithm;
use crate::oids;
use der::asn1::ObjectIdentifier;
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{Signature as P384Signature, VerifyingKey as P384VerifyingKey};
use pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use spki::SubjectPublicKeyInfoRef;

/// Why a signature check did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CryptoFailure {
    /// Signature does not verify under the key
    Mismatch,
    /// Algorithm or key type not recognized
    UnknownAlgorithm(String),
    /// Algorithm recognized but not implemented
    UnsupportedAlgorithm(String),
    /// Key or signature could not be processed
    Processing(String),
}

impl std::fmt::Display for CryptoFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoFailure::Mismatch => write!(f, "signature mismatch"),
            CryptoFailure::UnknownAlgorithm(oid) => write!(f, "unknown algorithm {oid}"),
            CryptoFailure::UnsupportedAlgorithm(oid) => write!(f, "unsupported algorithm {oid}"),
            CryptoFailure::Processing(msg) => write!(f, "{msg}"),
        }
    }
}

/// Accept or reject a signer's signatureAlgorithm before key routing.
pub(crate) fn check_signature_algorithm(oid: &ObjectIdentifier) -> Result<(), CryptoFailure> {
    const SUPPORTED: [ObjectIdentifier; 10] = [
        oids::RSA_ENCRYPTION,
        oids::SHA1_WITH_RSA,
        oids::SHA256_WITH_RSA,
        oids::SHA384_WITH_RSA,
        oids::SHA512_WITH_RSA,
        oids::EC_PUBLIC_KEY,
        oids::ECDSA_WITH_SHA1,
        oids::ECDSA_WITH_SHA256,
        oids::ECDSA_WITH_SHA384,
        oids::ECDSA_WITH_SHA512,
    ];
    const KNOWN_UNSUPPORTED: [ObjectIdentifier; 3] = [oids::RSASSA_PSS, oids::ED25519, oids::DSA];

    if SUPPORTED.contains(oid) || DigestAlgorithm::from_oid(oid).is_ok() {
        Ok(())
    } else if KNOWN_UNSUPPORTED.contains(oid) {
        Err(CryptoFailure::UnsupportedAlgorithm(oid.to_string()))
    } else {
        Err(CryptoFailure::UnknownAlgorithm(oid.to_string()))
    }
}

/// Verify `signature` over an already computed `digest` with the key in
/// `spki_der`.
pub(crate) fn verify_digest_signature(
    spki_der: &[u8],
    digest_alg: DigestAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), CryptoFailure> {
    let spki = SubjectPublicKeyInfoRef::try_from(spki_der)
        .map_err(|e| CryptoFailure::Processing(format!("bad SubjectPublicKeyInfo: {e}")))?;
    let key_oid = spki.algorithm.oid;

    if key_oid == oids::RSA_ENCRYPTION {
        return verify_rsa(spki_der, digest_alg, digest, signature);
    }

    if key_oid == oids::EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters_oid()
            .map_err(|e| CryptoFailure::Processing(format!("bad EC curve parameters: {e}")))?;
        return if curve == oids::SECP256R1 {
            verify_p256(spki_der, digest, signature)
        } else if curve == oids::SECP384R1 {
            verify_p384(spki_der, digest, signature)
        } else if curve == oids::SECP521R1 {
            Err(CryptoFailure::UnsupportedAlgorithm(curve.to_string()))
        } else {
            Err(CryptoFailure::UnknownAlgorithm(curve.to_string()))
        };
    }

    if key_oid == oids::RSASSA_PSS || key_oid == oids::ED25519 || key_oid == oids::DSA {
        return Err(CryptoFailure::UnsupportedAlgorithm(key_oid.to_string()));
    }
    Err(CryptoFailure::UnknownAlgorithm(key_oid.to_string()))
}

/// Verify that `issuer` signed `subject`.
pub(crate) fn verify_certificate_signature(
    issuer: &Certificate,
    subject: &Certificate,
) -> Result<(), CryptoFailure> {
    let sig_oid = subject.signature_algorithm();
    if *sig_oid == oids::RSASSA_PSS {
        return Err(CryptoFailure::UnsupportedAlgorithm(sig_oid.to_string()));
    }
    let digest_alg = DigestAlgorithm::from_signature_oid(sig_oid)
        .map_err(|_| CryptoFailure::UnknownAlgorithm(sig_oid.to_string()))?;

    let tbs_digest = digest_alg.compute(subject.tbs_der());
    verify_digest_signature(issuer.spki_der(), digest_alg, &tbs_digest, subject.signature())
}

fn verify_rsa(
    spki_der: &[u8],
    digest_alg: DigestAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), CryptoFailure> {
    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| CryptoFailure::Processing(format!("bad RSA public key: {e}")))?;

    let scheme = match digest_alg {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    };

    match key.verify(scheme, digest, signature) {
        Ok(()) => Ok(()),
        Err(rsa::Error::Verification) => {
            // Some signers omit the NULL parameter in DigestInfo
            match key.verify(pkcs1v15_without_null(digest_alg), digest, signature) {
                Ok(()) => Ok(()),
                Err(rsa::Error::Verification) => Err(CryptoFailure::Mismatch),
                Err(e) => Err(CryptoFailure::Processing(format!("RSA verification error: {e}"))),
            }
        },
        Err(e) => Err(CryptoFailure::Processing(format!("RSA verification error: {e}"))),
    }
}

/// PKCS#1 v1.5 DigestInfo prefix whose AlgorithmIdentifier has no NULL.
fn pkcs1v15_without_null(digest_alg: DigestAlgorithm) -> Pkcs1v15Sign {
    let oid = digest_alg.oid();
    let oid_bytes = oid.as_bytes();
    let oid_len = oid_bytes.len() as u8;
    let hash_len = digest_alg.output_len();

    let mut prefix = vec![
        0x30,
        oid_len + 6 + hash_len as u8, // DigestInfo SEQUENCE
        0x30,
        oid_len + 2, // AlgorithmIdentifier SEQUENCE, no 05 00
        0x06,
        oid_len,
    ];
    prefix.extend_from_slice(oid_bytes);
    prefix.extend_from_slice(&[0x04, hash_len as u8]);

    Pkcs1v15Sign {
        hash_len: Some(hash_len),
        prefix: prefix.into_boxed_slice(),
    }
}

fn verify_p256(spki_der: &[u8], digest: &[u8], signature: &[u8]) -> Result<(), CryptoFailure> {
    let key = P256VerifyingKey::from_public_key_der(spki_der)
        .map_err(|e| CryptoFailure::Processing(format!("bad P-256 public key: {e}")))?;
    // A signature that is not valid DER cannot match
    let sig = P256Signature::from_der(signature).map_err(|_| CryptoFailure::Mismatch)?;
    key.verify_prehash(digest, &sig)
        .map_err(|_| CryptoFailure::Mismatch)
}

fn verify_p384(spki_der: &[u8], digest: &[u8], signature: &[u8]) -> Result<(), CryptoFailure> {
    let key = P384VerifyingKey::from_public_key_der(spki_der)
        .map_err(|e| CryptoFailure::Processing(format!("bad P-384 public key: {e}")))?;
    let sig = P384Signature::from_der(signature).map_err(|_| CryptoFailure::Mismatch)?;
    key.verify_prehash(digest, &sig)
        .map_err(|_| CryptoFailure::Mismatch)
}

/// Constant-time byte comparison for digests.
#[inline(never)]
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
