//! Message digests keyed by algorithm identifier.
//!
//! Two lookups are exposed:
//!
//! - [`digest`] hashes a buffer with the algorithm named by an OID
//! - [`digest_length`] is a fixed table of output lengths, independent of the
//!   hash implementations
//!
//! Both fail with [`Error::UnrecognizedAlgorithm`] for identifiers outside
//! SHA-1 and the SHA-2 family. Neither ever yields an empty digest.

use crate::error::{Error, Result};
use crate::oids;
use der::asn1::ObjectIdentifier;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest algorithm declared by a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy signatures)
    #[serde(rename = "SHA-1")]
    Sha1,
    /// SHA-256
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    /// All supported algorithms.
    pub const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => oids::ID_SHA1,
            DigestAlgorithm::Sha256 => oids::ID_SHA256,
            DigestAlgorithm::Sha384 => oids::ID_SHA384,
            DigestAlgorithm::Sha512 => oids::ID_SHA512,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Resolve a bare digest OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.oid() == *oid)
            .ok_or_else(|| Error::UnrecognizedAlgorithm(oid.to_string()))
    }

    /// Resolve the digest half of a combined signature algorithm OID
    /// (`sha256WithRSAEncryption`, `ecdsa-with-SHA384`, ...).
    ///
    /// Bare digest OIDs are accepted too, since some signers put them in the
    /// signature algorithm field.
    pub fn from_signature_oid(oid: &ObjectIdentifier) -> Result<Self> {
        const COMBINED: [(ObjectIdentifier, DigestAlgorithm); 8] = [
            (oids::SHA1_WITH_RSA, DigestAlgorithm::Sha1),
            (oids::ECDSA_WITH_SHA1, DigestAlgorithm::Sha1),
            (oids::SHA256_WITH_RSA, DigestAlgorithm::Sha256),
            (oids::ECDSA_WITH_SHA256, DigestAlgorithm::Sha256),
            (oids::SHA384_WITH_RSA, DigestAlgorithm::Sha384),
            (oids::ECDSA_WITH_SHA384, DigestAlgorithm::Sha384),
            (oids::SHA512_WITH_RSA, DigestAlgorithm::Sha512),
            (oids::ECDSA_WITH_SHA512, DigestAlgorithm::Sha512),
        ];

        match COMBINED.iter().find(|(candidate, _)| candidate == oid) {
            Some((_, alg)) => Ok(*alg),
            None => Self::from_oid(oid),
        }
    }

    /// Hash `data` with this algorithm.
    pub fn compute(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(data);
                hasher.finalize().to_vec()
            },
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                hasher.finalize().to_vec()
            },
            DigestAlgorithm::Sha384 => {
                let mut hasher = Sha384::new();
                hasher.update(data);
                hasher.finalize().to_vec()
            },
            DigestAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(data);
                hasher.finalize().to_vec()
            },
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash `buffer` with the algorithm identified by `algorithm_oid`.
pub fn digest(buffer: &[u8], algorithm_oid: &ObjectIdentifier) -> Result<Vec<u8>> {
    let algorithm = DigestAlgorithm::from_oid(algorithm_oid)?;
    Ok(algorithm.compute(buffer))
}

/// Output length of the digest identified by `algorithm_oid`.
///
/// This is a lookup table and does not consult the hash implementations.
pub fn digest_length(algorithm_oid: &ObjectIdentifier) -> Result<usize> {
    const LENGTHS: [(ObjectIdentifier, usize); 4] = [
        (oids::ID_SHA1, 20),
        (oids::ID_SHA256, 32),
        (oids::ID_SHA384, 48),
        (oids::ID_SHA512, 64),
    ];

    LENGTHS
        .iter()
        .find(|(oid, _)| oid == algorithm_oid)
        .map(|(_, len)| *len)
        .ok_or_else(|| Error::UnrecognizedAlgorithm(algorithm_oid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_length_table() {
        assert_eq!(digest_length(&oids::ID_SHA1).unwrap(), 20);
        assert_eq!(digest_length(&oids::ID_SHA256).unwrap(), 32);
        assert_eq!(digest_length(&oids::ID_SHA384).unwrap(), 48);
        assert_eq!(digest_length(&oids::ID_SHA512).unwrap(), 64);
    }

    #[test]
    fn test_digest_length_unrecognized() {
        let err = digest_length(&oids::ID_MD5).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedAlgorithm(_)));
        assert!(err.to_string().contains("1.2.840.113549.2.5"));

        // A signature algorithm is not a digest algorithm
        assert!(digest_length(&oids::SHA256_WITH_RSA).is_err());
    }

    #[test]
    fn test_table_matches_implementations() {
        for alg in DigestAlgorithm::ALL {
            let out = digest(b"abc", &alg.oid()).unwrap();
            assert_eq!(out.len(), digest_length(&alg.oid()).unwrap());
            assert_eq!(out.len(), alg.output_len());
        }
    }

    #[test]
    fn test_sha256_known_answer() {
        let out = digest(b"abc", &oids::ID_SHA256).unwrap();
        assert_eq!(
            &out[..4],
            &[0xba_u8, 0x78, 0x16, 0xbf],
            "SHA-256(\"abc\") starts with ba7816bf"
        );
    }

    #[test]
    fn test_digest_unsupported_oid_is_error() {
        let result = digest(b"data", &oids::ID_MD5);
        assert!(matches!(result, Err(Error::UnrecognizedAlgorithm(_))));
    }

    #[test]
    fn test_from_signature_oid() {
        assert_eq!(
            DigestAlgorithm::from_signature_oid(&oids::SHA384_WITH_RSA).unwrap(),
            DigestAlgorithm::Sha384
        );
        assert_eq!(
            DigestAlgorithm::from_signature_oid(&oids::ECDSA_WITH_SHA256).unwrap(),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            DigestAlgorithm::from_signature_oid(&oids::ID_SHA1).unwrap(),
            DigestAlgorithm::Sha1
        );
        assert!(DigestAlgorithm::from_signature_oid(&oids::RSASSA_PSS).is_err());
    }

    #[test]
    fn test_digest_algorithm_name() {
        assert_eq!(DigestAlgorithm::Sha256.name(), "SHA-256");
        assert_eq!(DigestAlgorithm::Sha512.to_string(), "SHA-512");
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha256);
    }
}
