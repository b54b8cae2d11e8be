//! Engine configuration: package tables, override profiles and preservation rules.
//!
//! [`EngineConfig::default`] carries the built-in tables. A TOML document may
//! replace any top-level section; sections it omits keep their built-in value.
//!
//! ```toml
//! debug = true
//!
//! [packages]
//! pubg = ["com.tencent.ig"]
//!
//! [profiles.pubg]
//! MODEL = "GM1917"
//!
//! [preserve]
//! "com.google.android.GoogleCamera" = ["BRAND", "MODEL"]
//!
//! [reference]
//! fingerprint = "google/husky/husky:15/AP41.250105.002/12731906:user/release-keys"
//! manufacturer = "Google"
//! model = "Pixel 8 Pro"
//! ```

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::field::IdentityField;
use crate::fingerprint::BuildFingerprint;
use crate::profile::{OverrideProfile, PreservationRules};

/// Package namespace treated as Google-owned.
pub const GOOGLE_PREFIX: &str = "com.google.";

/// Play services; classifying it arms the attestation guard.
pub const PACKAGE_GMS: &str = "com.google.android.gms";

/// Settings intelligence indexes against the live build fingerprint.
pub const PACKAGE_SETTINGS_INTELLIGENCE: &str = "com.google.android.settings.intelligence";

pub const PACKAGE_GOOGLE_CAMERA: &str = "com.google.android.GoogleCamera";

/// Third-party packages that get the reference device profile.
pub const EXTRA_PACKAGES: [&str; 7] = [
    "com.android.chrome",
    "com.android.vending",
    "com.breel.wallpapers20",
    "com.amazon.avod.thirdpartyclient",
    "com.disney.disneyplus",
    "com.netflix.mediaclient",
    "in.startv.hotstar",
];

/// Titles that unlock high frame rate modes on the PUBG model.
pub const PUBG_PACKAGES: [&str; 7] = [
    "com.tencent.ig",
    "com.pubg.krmobile",
    "com.vng.pubgmobile",
    "com.rekoo.pubgm",
    "com.pubg.imobile",
    "com.pubg.newstate",
    // Asphalt 9
    "com.gameloft.android.ANMP.GloftA9HM",
];

pub const COD_PACKAGES: [&str; 1] = ["com.activision.callofduty.shooter"];

const REFERENCE_FINGERPRINT: &str =
    "google/raven/raven:12/SQ1D.211205.016.A1/7957957:user/release-keys";

/// Package tables used for caller classification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageTables {
    pub google_prefix: String,
    pub extra: BTreeSet<String>,
    pub settings_intelligence: String,
    pub privileged_services: String,
    pub pubg: BTreeSet<String>,
    pub call_of_duty: BTreeSet<String>,
}

impl Default for PackageTables {
    fn default() -> Self {
        PackageTables {
            google_prefix: GOOGLE_PREFIX.to_string(),
            extra: EXTRA_PACKAGES.iter().map(|p| p.to_string()).collect(),
            settings_intelligence: PACKAGE_SETTINGS_INTELLIGENCE.to_string(),
            privileged_services: PACKAGE_GMS.to_string(),
            pubg: PUBG_PACKAGES.iter().map(|p| p.to_string()).collect(),
            call_of_duty: COD_PACKAGES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The three override profiles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profiles {
    /// Reference device for Google and listed third-party packages.
    pub default: OverrideProfile,
    pub pubg: OverrideProfile,
    pub cod: OverrideProfile,
}

impl Default for Profiles {
    fn default() -> Self {
        Profiles {
            default: OverrideProfile::new()
                .with(IdentityField::Brand, "google")
                .with(IdentityField::Manufacturer, "Google")
                .with(IdentityField::Device, "raven")
                .with(IdentityField::Product, "raven")
                .with(IdentityField::Model, "Pixel 6 Pro")
                .with(IdentityField::Fingerprint, REFERENCE_FINGERPRINT),
            pubg: OverrideProfile::new().with(IdentityField::Model, "GM1917"),
            cod: OverrideProfile::new().with(IdentityField::Model, "SO-52A"),
        }
    }
}

fn default_preservation() -> PreservationRules {
    PreservationRules::new()
        .keep(PACKAGE_SETTINGS_INTELLIGENCE, [IdentityField::Fingerprint])
        .keep(PACKAGE_GOOGLE_CAMERA, IdentityField::ALL)
}

/// Derives the default profile from a single fingerprint line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceDevice {
    pub fingerprint: String,
    pub manufacturer: String,
    pub model: String,
}

/// Complete engine configuration. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Emit per-field diagnostic events.
    pub debug: bool,
    pub packages: PackageTables,
    pub profiles: Profiles,
    pub preserve: PreservationRules,
    /// When set, replaces `profiles.default` on load.
    pub reference: Option<ReferenceDevice>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            debug: false,
            packages: PackageTables::default(),
            profiles: Profiles::default(),
            preserve: default_preservation(),
            reference: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document, resolving `[reference]` into the default profile.
    ///
    /// `[reference]` and `[profiles.default]` both define the default profile,
    /// so a document may carry at most one of them.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = text.parse()?;
        let explicit_default = table
            .get("profiles")
            .and_then(|profiles| profiles.get("default"))
            .is_some();
        if explicit_default && table.contains_key("reference") {
            return Err(ConfigError::ConflictingDefaultProfile);
        }

        let mut config: EngineConfig = toml::Value::Table(table).try_into()?;
        if let Some(reference) = &config.reference {
            let fp = BuildFingerprint::parse(&reference.fingerprint)?;
            config.profiles.default =
                OverrideProfile::from_fingerprint(&fp, &reference.manufacturer, &reference.model);
        }
        config.validate();
        Ok(config)
    }

    /// Same as [`from_toml_str`](Self::from_toml_str) for raw bytes.
    pub fn from_toml_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::from_toml_str(std::str::from_utf8(bytes)?)
    }

    /// Warn about a default profile whose FINGERPRINT contradicts its own
    /// BRAND/PRODUCT/DEVICE. Returns the number of inconsistencies found.
    ///
    /// Inconsistent profiles still load; some hosts deliberately mix them.
    pub fn validate(&self) -> usize {
        let profile = &self.profiles.default;
        let Some(line) = profile.get(IdentityField::Fingerprint) else {
            return 0;
        };
        let fp = match BuildFingerprint::parse(line) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(fingerprint = line, error = %e, "default profile fingerprint is malformed");
                return 1;
            }
        };

        let mut mismatches = 0;
        for (field, expected) in [
            (IdentityField::Brand, fp.brand.as_str()),
            (IdentityField::Product, fp.product.as_str()),
            (IdentityField::Device, fp.device.as_str()),
        ] {
            if let Some(value) = profile.get(field) {
                if value != expected {
                    warn!(
                        field = %field,
                        value,
                        fingerprint = expected,
                        "default profile disagrees with its fingerprint"
                    );
                    mismatches += 1;
                }
            }
        }
        mismatches
    }
}
