//! Build fingerprint parsing.
//!
//! A build fingerprint has the fixed shape
//! ```text
//! google/raven/raven:12/SQ1D.211205.016.A1/7957957:user/release-keys
//! brand /product/device:release/id/incremental:type/tags
//! ```
//! The engine uses it to derive a reference-device profile from a single line
//! and to sanity check that a configured FINGERPRINT agrees with the
//! BRAND/PRODUCT/DEVICE it is shipped with.

use std::fmt;

use crate::error::FingerprintError;

/// A parsed build fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFingerprint {
    pub brand: String,
    pub product: String,
    pub device: String,
    pub release: String,
    pub build_id: String,
    pub incremental: String,
    pub build_type: String,
    pub tags: String,
}

fn split_colon(segment: &str) -> Result<(&str, &str), FingerprintError> {
    segment
        .split_once(':')
        .ok_or_else(|| FingerprintError::MissingColon(segment.to_string()))
}

fn non_empty(name: &'static str, value: &str) -> Result<String, FingerprintError> {
    if value.is_empty() {
        return Err(FingerprintError::EmptyComponent(name));
    }
    Ok(value.to_string())
}

impl BuildFingerprint {
    /// Parse one fingerprint line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, FingerprintError> {
        let segments: Vec<&str> = line.trim().split('/').collect();
        if segments.len() != 6 {
            return Err(FingerprintError::SegmentCount(segments.len()));
        }
        let (device, release) = split_colon(segments[2])?;
        let (incremental, build_type) = split_colon(segments[4])?;

        Ok(BuildFingerprint {
            brand: non_empty("brand", segments[0])?,
            product: non_empty("product", segments[1])?,
            device: non_empty("device", device)?,
            release: non_empty("release", release)?,
            build_id: non_empty("id", segments[3])?,
            incremental: non_empty("incremental", incremental)?,
            build_type: non_empty("type", build_type)?,
            tags: non_empty("tags", segments[5])?,
        })
    }
}

impl fmt::Display for BuildFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}/{}/{}:{}/{}",
            self.brand,
            self.product,
            self.device,
            self.release,
            self.build_id,
            self.incremental,
            self.build_type,
            self.tags
        )
    }
}
