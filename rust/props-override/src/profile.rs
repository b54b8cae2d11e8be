//! Override profiles and per-package preservation rules.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::field::IdentityField;
use crate::fingerprint::BuildFingerprint;

/// Replacement values for a subset of identity fields.
///
/// Iteration follows [`IdentityField::ALL`] order regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct OverrideProfile {
    values: BTreeMap<IdentityField, String>,
}

impl OverrideProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: IdentityField, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Derive a full reference-device profile from one fingerprint line.
    ///
    /// BRAND, PRODUCT and DEVICE come from the fingerprint itself; the
    /// manufacturer and marketing model are not encoded in it.
    pub fn from_fingerprint(fp: &BuildFingerprint, manufacturer: &str, model: &str) -> Self {
        OverrideProfile::new()
            .with(IdentityField::Brand, fp.brand.as_str())
            .with(IdentityField::Manufacturer, manufacturer)
            .with(IdentityField::Device, fp.device.as_str())
            .with(IdentityField::Product, fp.product.as_str())
            .with(IdentityField::Model, model)
            .with(IdentityField::Fingerprint, fp.to_string())
    }

    pub fn get(&self, field: IdentityField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IdentityField, &str)> {
        self.values.iter().map(|(field, value)| (*field, value.as_str()))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

/// Fields a given package must keep even when it matches an override profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PreservationRules {
    keep: HashMap<String, BTreeSet<IdentityField>>,
}

impl PreservationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep(
        mut self,
        package: impl Into<String>,
        fields: impl IntoIterator<Item = IdentityField>,
    ) -> Self {
        self.keep.entry(package.into()).or_default().extend(fields);
        self
    }

    /// True if `field` must not be overridden for `package`.
    pub fn preserves(&self, package: &str, field: IdentityField) -> bool {
        self.keep
            .get(package)
            .is_some_and(|fields| fields.contains(&field))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.keep.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_iterates_in_field_order() {
        let profile = OverrideProfile::new()
            .with(IdentityField::Fingerprint, "fp")
            .with(IdentityField::Brand, "google")
            .with(IdentityField::Model, "Pixel 6 Pro");
        let fields: Vec<_> = profile.iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            vec![
                IdentityField::Brand,
                IdentityField::Model,
                IdentityField::Fingerprint
            ]
        );
    }

    #[test]
    fn test_profile_with_overwrites() {
        let profile = OverrideProfile::new()
            .with(IdentityField::Model, "first")
            .with(IdentityField::Model, "second");
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.get(IdentityField::Model), Some("second"));
    }

    #[test]
    fn test_profile_from_fingerprint() {
        let fp = BuildFingerprint::parse(
            "google/husky/husky:15/AP41.250105.002/12731906:user/release-keys",
        )
        .unwrap();
        let profile = OverrideProfile::from_fingerprint(&fp, "Google", "Pixel 8 Pro");
        assert_eq!(profile.len(), 6);
        assert_eq!(profile.get(IdentityField::Brand), Some("google"));
        assert_eq!(profile.get(IdentityField::Device), Some("husky"));
        assert_eq!(profile.get(IdentityField::Product), Some("husky"));
        assert_eq!(profile.get(IdentityField::Model), Some("Pixel 8 Pro"));
        assert_eq!(
            profile.get(IdentityField::Fingerprint),
            Some("google/husky/husky:15/AP41.250105.002/12731906:user/release-keys")
        );
    }

    #[test]
    fn test_preservation_lookup() {
        let rules = PreservationRules::new()
            .keep("com.example.camera", IdentityField::ALL)
            .keep("com.example.index", [IdentityField::Fingerprint]);

        for field in IdentityField::ALL {
            assert!(rules.preserves("com.example.camera", field));
        }
        assert!(rules.preserves("com.example.index", IdentityField::Fingerprint));
        assert!(!rules.preserves("com.example.index", IdentityField::Model));
        assert!(!rules.preserves("com.example.other", IdentityField::Fingerprint));
    }

    #[test]
    fn test_preservation_keep_merges() {
        let rules = PreservationRules::new()
            .keep("pkg", [IdentityField::Brand])
            .keep("pkg", [IdentityField::Model]);
        assert_eq!(rules.len(), 1);
        assert!(rules.preserves("pkg", IdentityField::Brand));
        assert!(rules.preserves("pkg", IdentityField::Model));
        assert!(!rules.preserves("pkg", IdentityField::Device));
    }
}
