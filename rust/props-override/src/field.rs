//! The closed set of `android.os.Build` identity fields the engine may touch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// One reported device-identity field.
///
/// Declaration order is the order in which overrides are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityField {
    Brand,
    Manufacturer,
    Device,
    Product,
    Model,
    Fingerprint,
}

impl IdentityField {
    /// Every field, in application order.
    pub const ALL: [IdentityField; 6] = [
        IdentityField::Brand,
        IdentityField::Manufacturer,
        IdentityField::Device,
        IdentityField::Product,
        IdentityField::Model,
        IdentityField::Fingerprint,
    ];

    /// Canonical name, identical to the `Build` static field name.
    pub const fn name(self) -> &'static str {
        match self {
            IdentityField::Brand => "BRAND",
            IdentityField::Manufacturer => "MANUFACTURER",
            IdentityField::Device => "DEVICE",
            IdentityField::Product => "PRODUCT",
            IdentityField::Model => "MODEL",
            IdentityField::Fingerprint => "FINGERPRINT",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdentityField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentityField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for IdentityField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
