//! Caller classification against the package tables.

use crate::config::PackageTables;

/// Which treatments apply to a caller. Not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallerClass {
    /// Google-owned namespace or an explicitly listed third-party package.
    pub googlified: bool,
    pub settings_intelligence: bool,
    pub pubg_family: bool,
    pub call_of_duty: bool,
    /// The package whose classification arms the attestation guard.
    pub privileged_services: bool,
}

impl CallerClass {
    pub fn classify(package: &str, tables: &PackageTables) -> Self {
        CallerClass {
            googlified: package.starts_with(tables.google_prefix.as_str())
                || tables.extra.contains(package),
            settings_intelligence: package == tables.settings_intelligence,
            pubg_family: tables.pubg.contains(package),
            call_of_duty: tables.call_of_duty.contains(package),
            privileged_services: package == tables.privileged_services,
        }
    }

    /// True when no treatment applies.
    pub fn is_unmatched(&self) -> bool {
        *self == CallerClass::default()
    }
}
