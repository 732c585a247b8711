//! Error types for the CMS verification library.
//!
//! Parse-time failures, algorithm lookups and backend lifecycle problems are
//! reported through [`Error`]. Verification verdicts are not errors: they are
//! returned as status values (see [`crate::signatures::CmsVerificationStatus`]
//! and [`crate::signatures::TrustOutcome`]).

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing and verifying signed messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input bytes do not decode as a CMS structure
    #[error("Malformed CMS encoding: {0}")]
    MalformedEncoding(String),

    /// Input decodes but is not a signed-data envelope with a signer
    #[error("Not a signed-data message: {0}")]
    NotSigned(String),

    /// Algorithm identifier not present in the supported table
    #[error("Unrecognized algorithm: {0}")]
    UnrecognizedAlgorithm(String),

    /// X.509 certificate could not be constructed
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Trust store could not be loaded
    #[error("Trust store error: {0}")]
    TrustStore(String),

    /// Invalid verification options
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend teardown attempted while temporary certificates are still registered
    #[error("Crypto backend busy: {outstanding} temporary certificate set(s) still registered")]
    BackendBusy {
        /// Number of registered sets that were never released
        outstanding: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_encoding_error() {
        let err = Error::MalformedEncoding("unexpected tag".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Malformed CMS encoding"));
        assert!(msg.contains("unexpected tag"));
    }

    #[test]
    fn test_not_signed_error() {
        let err = Error::NotSigned("1.2.840.113549.1.7.3".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Not a signed-data message"));
        assert!(msg.contains("1.2.840.113549.1.7.3"));
    }

    #[test]
    fn test_backend_busy_error() {
        let err = Error::BackendBusy { outstanding: 2 };
        let msg = format!("{}", err);
        assert!(msg.contains("2 temporary certificate set"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
