//! Error types shared across the override engine.

use thiserror::Error;

use crate::field::IdentityField;

/// Failure reported by the host when writing one identity field.
///
/// Never fatal to an override pass: the engine records it and moves on to the
/// next field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The host identity surface has no such field.
    #[error("identity field {0} is not present on this platform")]
    Missing(IdentityField),
    /// The field exists but the host refused the write.
    #[error("write access to identity field {0} was denied")]
    AccessDenied(IdentityField),
}

/// Raised to deny a certificate chain request from the integrity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestationError {
    /// Maps to the platform's unsupported-operation failure.
    #[error("certificate chain generation is not supported for this caller")]
    Unsupported,
}

/// Errors while parsing a build fingerprint line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error("fingerprint has {0} '/'-separated segments, expected 6")]
    SegmentCount(usize),
    #[error("fingerprint segment `{0}` is missing its ':' separator")]
    MissingColon(String),
    #[error("fingerprint component `{0}` is empty")]
    EmptyComponent(&'static str),
}

/// Errors while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown identity field `{0}`")]
    UnknownField(String),
    #[error("config is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("reference fingerprint is malformed: {0}")]
    Fingerprint(#[from] FingerprintError),
    #[error("[reference] and [profiles.default] both define the default profile")]
    ConflictingDefaultProfile,
}
