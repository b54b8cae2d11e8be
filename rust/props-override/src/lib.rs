//! Per-package build identity overrides for CleveresTricky.
//!
//! Decides, for the package a process is launched for, which `android.os.Build`
//! identity fields to spoof and with what values, then writes them through a
//! host-provided [`IdentitySurface`]. Also hosts the guard that denies
//! certificate chains to the DroidGuard integrity runtime inside Play services.
//!
//! The C++ hook drives everything through the `rust_props_*` symbols in
//! [`ffi`]; Rust hosts use [`PropsEngine`] directly.

pub mod attestation;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod field;
pub mod fingerprint;
pub mod host;
pub mod profile;

pub use attestation::{FrameDescriptor, InvocationContext};
pub use config::EngineConfig;
pub use engine::{ApplyReport, PropsEngine};
pub use error::{AttestationError, ConfigError, FieldError};
pub use field::IdentityField;
pub use host::{Capabilities, IdentitySurface, PropertySource, StaticProperties, SystemProperties};
pub use profile::{OverrideProfile, PreservationRules};
