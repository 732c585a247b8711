//! Verification options.
//!
//! Options control path validation (usage profile, revocation policy, depth
//! limit, evaluation time) and how tolerant the parser is of container
//! padding.
//!
//! # Example
//!
//! ```
//! use cms_oxide::config::{RevocationPolicy, VerifyOptions};
//!
//! // Lenient mode - soft-fail revocation, trailing zero padding accepted (default)
//! let lenient = VerifyOptions::lenient();
//!
//! // Strict mode - revocation must be confirmed, no padding
//! let strict = VerifyOptions::strict();
//! assert_eq!(strict.revocation_policy, RevocationPolicy::HardFail);
//!
//! // Custom configuration
//! let custom = VerifyOptions::default()
//!     .with_revocation_policy(RevocationPolicy::Disabled)
//!     .with_max_chain_depth(4);
//! assert_eq!(custom.max_chain_depth, 4);
//! ```

use chrono::{DateTime, Utc};

/// What to do when revocation status cannot be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationPolicy {
    /// An unavailable answer is recorded as a warning; the certificate stays trusted
    #[default]
    SoftFail,
    /// An unavailable answer fails path validation
    HardFail,
    /// Revocation is not consulted
    Disabled,
}

/// Usage profile the signer certificate must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateUsage {
    /// Email / document signer.
    ///
    /// Key usage, when present, must allow digitalSignature or
    /// nonRepudiation. Extended key usage, when present, must allow
    /// emailProtection or anyExtendedKeyUsage.
    #[default]
    EmailSigner,
    /// No usage constraints on the leaf certificate
    Any,
}

/// Options for signature and certificate verification.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Revocation handling during path validation
    pub revocation_policy: RevocationPolicy,

    /// Usage profile checked on the signer certificate
    pub usage: CertificateUsage,

    /// Time at which validity windows are evaluated (None = now)
    pub verification_time: Option<DateTime<Utc>>,

    /// Maximum number of issuer hops before path validation gives up
    ///
    /// Default: 16
    pub max_chain_depth: usize,

    /// Accept zero bytes after the outer DER value.
    ///
    /// Signature containers are usually reserved at a fixed size and
    /// zero-filled, so the encoded message is followed by padding.
    pub allow_trailing_padding: bool,
}

impl Default for VerifyOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl VerifyOptions {
    /// Default maximum chain depth.
    pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 16;

    /// Lenient mode: soft-fail revocation, padded input accepted
    pub fn lenient() -> Self {
        Self {
            revocation_policy: RevocationPolicy::SoftFail,
            usage: CertificateUsage::EmailSigner,
            verification_time: None,
            max_chain_depth: Self::DEFAULT_MAX_CHAIN_DEPTH,
            allow_trailing_padding: true,
        }
    }

    /// Strict mode: revocation must be confirmed, input must be exact DER
    pub fn strict() -> Self {
        Self {
            revocation_policy: RevocationPolicy::HardFail,
            allow_trailing_padding: false,
            ..Self::lenient()
        }
    }

    /// Set the revocation policy.
    pub fn with_revocation_policy(mut self, policy: RevocationPolicy) -> Self {
        self.revocation_policy = policy;
        self
    }

    /// Set the usage profile.
    pub fn with_usage(mut self, usage: CertificateUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Evaluate validity windows at a fixed time.
    pub fn with_verification_time(mut self, time: DateTime<Utc>) -> Self {
        self.verification_time = Some(time);
        self
    }

    /// Set the maximum chain depth.
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    /// Accept or reject trailing zero padding.
    pub fn with_trailing_padding(mut self, allow: bool) -> Self {
        self.allow_trailing_padding = allow;
        self
    }

    /// The time validity windows are evaluated at.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.verification_time.unwrap_or_else(Utc::now)
    }
}
