//! Host platform seams: the writable identity surface and system properties.

use std::collections::HashMap;

use crate::error::FieldError;
use crate::field::IdentityField;

/// Property advertising high refresh rate panels.
pub const PROP_SUPPORT_HIGH_FPS: &str = "ro.device.support_high_fps";

/// Property enabling content-adaptive refresh in SurfaceFlinger.
pub const PROP_CONTENT_REFRESH: &str =
    "ro.surface_flinger.use_content_detection_for_refresh_rate";

/// The host's reported build identity, mutated in place.
pub trait IdentitySurface {
    /// Overwrite one reported identity field.
    fn set_field(&mut self, field: IdentityField, value: &str) -> Result<(), FieldError>;

    /// The live `Build.VERSION.INCREMENTAL` of the running system.
    fn build_incremental(&self) -> String;
}

/// Read-only access to system properties.
pub trait PropertySource {
    fn get(&self, name: &str) -> Option<String>;

    /// Boolean lookup with `SystemProperties.getBoolean` semantics.
    fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name)
            .map(|value| parse_bool(&value, default))
            .unwrap_or(default)
    }
}

/// Parse a property value the way Android's `SystemProperties.getBoolean` does.
pub fn parse_bool(value: &str, default: bool) -> bool {
    match value {
        "1" | "y" | "yes" | "on" | "true" => true,
        "0" | "n" | "no" | "off" | "false" => false,
        _ => default,
    }
}

/// Display capabilities that gate the game profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub high_refresh: bool,
    pub content_refresh: bool,
}

impl Capabilities {
    /// Read both flags once; absent properties count as `false`.
    pub fn from_properties(props: &dyn PropertySource) -> Self {
        Capabilities {
            high_refresh: props.get_bool(PROP_SUPPORT_HIGH_FPS, false),
            content_refresh: props.get_bool(PROP_CONTENT_REFRESH, false),
        }
    }

    /// Game profiles apply when either capability is present.
    pub fn game_profiles_enabled(&self) -> bool {
        self.high_refresh || self.content_refresh
    }
}

/// In-memory property map.
#[derive(Debug, Clone, Default)]
pub struct StaticProperties {
    values: HashMap<String, String>,
}

impl StaticProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl PropertySource for StaticProperties {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Android system properties via bionic's `__system_property_get`.
///
/// On other targets every property reads as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProperties;

#[cfg(target_os = "android")]
const PROP_VALUE_MAX: usize = 92;

impl PropertySource for SystemProperties {
    #[cfg(target_os = "android")]
    fn get(&self, name: &str) -> Option<String> {
        let name = std::ffi::CString::new(name).ok()?;
        let mut buf = [0 as libc::c_char; PROP_VALUE_MAX];
        // SAFETY: `name` is NUL-terminated and `buf` holds PROP_VALUE_MAX bytes,
        // the maximum bionic writes including the terminator.
        let len = unsafe { libc::__system_property_get(name.as_ptr(), buf.as_mut_ptr()) };
        if len <= 0 {
            return None;
        }
        // SAFETY: bionic always NUL-terminates the value it wrote.
        let value = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
        Some(value.to_string_lossy().into_owned())
    }

    #[cfg(not(target_os = "android"))]
    fn get(&self, _name: &str) -> Option<String> {
        None
    }
}
