//! The override engine: per-package identity spoofing and the attestation guard.
//!
//! One engine is built at process start and shared by reference between the
//! process-launch hook (which calls [`PropsEngine::apply_overrides_for`]) and
//! the keystore hook (which calls [`PropsEngine::check_certificate_chain`]).

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::attestation::InvocationContext;
use crate::classify::CallerClass;
use crate::config::EngineConfig;
use crate::error::{AttestationError, FieldError};
use crate::field::IdentityField;
use crate::host::{Capabilities, IdentitySurface, PropertySource};
use crate::profile::OverrideProfile;

/// Outcome of one override pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Fields written, in write order.
    pub written: Vec<(IdentityField, String)>,
    /// Fields left alone because of a preservation rule.
    pub preserved: Vec<IdentityField>,
    /// Writes the host rejected. Never fatal.
    pub failures: Vec<FieldError>,
}

impl ApplyReport {
    /// True if the pass attempted no writes at all.
    pub fn is_noop(&self) -> bool {
        self.written.is_empty() && self.failures.is_empty()
    }
}

/// Per-process identity override engine.
#[derive(Debug)]
pub struct PropsEngine {
    config: EngineConfig,
    capabilities: Capabilities,
    /// Latched once the privileged services package has been classified.
    gms_caller: AtomicBool,
}

impl PropsEngine {
    pub fn new(config: EngineConfig, capabilities: Capabilities) -> Self {
        PropsEngine {
            config,
            capabilities,
            gms_caller: AtomicBool::new(false),
        }
    }

    /// Build an engine, reading the capability flags from `props` once.
    pub fn from_properties(config: EngineConfig, props: &dyn PropertySource) -> Self {
        Self::new(config, Capabilities::from_properties(props))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether the privileged services package has been seen in this process.
    pub fn is_gms_caller(&self) -> bool {
        self.gms_caller.load(Ordering::Acquire)
    }

    /// Apply every override that `package` qualifies for.
    ///
    /// An absent package is a silent no-op. Write failures are logged and
    /// recorded in the report; the remaining fields are still applied.
    pub fn apply_overrides_for(
        &self,
        package: Option<&str>,
        surface: &mut dyn IdentitySurface,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let Some(package) = package else {
            return report;
        };

        let class = CallerClass::classify(package, &self.config.packages);
        if class.privileged_services {
            self.gms_caller.store(true, Ordering::Release);
        }

        if class.googlified {
            if self.config.debug {
                debug!(package, "defining props");
            }
            for (field, value) in self.config.profiles.default.iter() {
                if self.config.preserve.preserves(package, field) {
                    if self.config.debug {
                        debug!(package, field = %field, "keeping prop");
                    }
                    report.preserved.push(field);
                    continue;
                }
                self.write(surface, field, value, &mut report);
            }
        }

        // Indexing must see the real build.
        if class.settings_intelligence {
            let incremental = surface.build_incremental();
            self.write(surface, IdentityField::Fingerprint, &incremental, &mut report);
        }

        if self.capabilities.game_profiles_enabled() {
            if class.pubg_family {
                self.apply_profile(package, &self.config.profiles.pubg, surface, &mut report);
            }
            if class.call_of_duty {
                self.apply_profile(package, &self.config.profiles.cod, surface, &mut report);
            }
        }

        report
    }

    fn apply_profile(
        &self,
        package: &str,
        profile: &OverrideProfile,
        surface: &mut dyn IdentitySurface,
        report: &mut ApplyReport,
    ) {
        if self.config.debug {
            debug!(package, "defining props");
        }
        for (field, value) in profile.iter() {
            self.write(surface, field, value, report);
        }
    }

    fn write(
        &self,
        surface: &mut dyn IdentitySurface,
        field: IdentityField,
        value: &str,
        report: &mut ApplyReport,
    ) {
        if self.config.debug {
            debug!(field = %field, value, "defining prop");
        }
        match surface.set_field(field, value) {
            Ok(()) => report.written.push((field, value.to_string())),
            Err(e) => {
                warn!(field = %field, error = %e, "failed to set prop");
                report.failures.push(e);
            }
        }
    }

    /// True if a certificate chain request must be denied.
    ///
    /// Only ever true in the privileged services process, and only when the
    /// request comes through the integrity subsystem.
    pub fn should_block_attestation(&self, ctx: &InvocationContext) -> bool {
        self.is_gms_caller() && ctx.from_integrity_subsystem()
    }

    /// Guard to call right before producing a certificate chain.
    pub fn check_certificate_chain(&self, ctx: &InvocationContext) -> Result<(), AttestationError> {
        if self.should_block_attestation(ctx) {
            if self.config.debug {
                debug!("denying certificate chain to integrity subsystem");
            }
            return Err(AttestationError::Unsupported);
        }
        Ok(())
    }
}
