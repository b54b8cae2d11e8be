//! C FFI bridge for the Zygisk → C++ entry → Rust core pipeline.
//!
//! The C++ side owns process bootstrap and the `Build` field writes; it
//! creates one engine per process, hands it the launching package name, and
//! consults the guard from the keystore hook before a certificate chain is
//! produced.
//!
//! # Safety
//!
//! All functions in this module use `unsafe` only at the FFI boundary to convert
//! between C pointers and Rust values. The inner logic is entirely safe Rust.

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic;
use std::ptr;

use tracing::warn;

use crate::attestation::{FrameDescriptor, InvocationContext};
use crate::config::EngineConfig;
use crate::engine::PropsEngine;
use crate::error::FieldError;
use crate::field::IdentityField;
use crate::host::{IdentitySurface, SystemProperties};

/// Setter status: the field was written.
pub const SET_OK: i32 = 0;
/// Setter status: the host has no such field.
pub const SET_MISSING: i32 = 1;

/// Host callback writing one `Build` field. Any status other than
/// [`SET_OK`] or [`SET_MISSING`] is treated as access denied.
pub type FieldSetter = unsafe extern "C" fn(
    user_data: *mut c_void,
    field: *const c_char,
    value: *const c_char,
) -> i32;

/// Validate pointer and length for slice creation.
///
/// Ensures that:
/// 1. `ptr` is not null unless `len` is 0.
/// 2. `ptr` is properly aligned for `T`.
/// 3. `len` * `size_of::<T>()` does not overflow `isize::MAX`.
///
/// Returns `None` if validation fails, or `Some(slice)` if successful.
unsafe fn validate_slice_args<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    #[allow(clippy::manual_is_multiple_of)]
    if (ptr as usize) % std::mem::align_of::<T>() != 0 {
        return None;
    }
    let size_of_t = std::mem::size_of::<T>();
    if size_of_t > 0 {
        let size = len.checked_mul(size_of_t)?;
        if size > isize::MAX as usize {
            return None;
        }
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

/// Borrow a UTF-8 string from a pointer/length pair. Null maps to `Some(None)`.
unsafe fn optional_str<'a>(ptr: *const u8, len: usize) -> Option<Option<&'a str>> {
    if ptr.is_null() {
        return Some(None);
    }
    let bytes = unsafe { validate_slice_args(ptr, len) }?;
    std::str::from_utf8(bytes).ok().map(Some)
}

/// [`IdentitySurface`] backed by a C callback.
struct CallbackSurface {
    setter: FieldSetter,
    user_data: *mut c_void,
    incremental: String,
}

impl IdentitySurface for CallbackSurface {
    fn set_field(&mut self, field: IdentityField, value: &str) -> Result<(), FieldError> {
        let name = CString::new(field.name()).map_err(|_| FieldError::Missing(field))?;
        let value = CString::new(value).map_err(|_| FieldError::AccessDenied(field))?;
        // SAFETY: both strings outlive the call; `user_data` is passed through
        // untouched as the caller of `rust_props_apply` promised.
        let status = unsafe { (self.setter)(self.user_data, name.as_ptr(), value.as_ptr()) };
        match status {
            SET_OK => Ok(()),
            SET_MISSING => Err(FieldError::Missing(field)),
            _ => Err(FieldError::AccessDenied(field)),
        }
    }

    fn build_incremental(&self) -> String {
        self.incremental.clone()
    }
}

/// Create an engine for this process.
///
/// `config_ptr`/`config_len` may hold a TOML engine config; pass null/0 for
/// the built-in tables. Capability flags are read from system properties.
/// Returns null if the config is invalid. Free with `rust_props_free`.
///
/// ```c
/// void *rust_props_new(const uint8_t *config_ptr, size_t config_len);
/// ```
///
/// # Safety
/// `config_ptr` must point to `config_len` valid bytes, or be null.
#[no_mangle]
pub unsafe extern "C" fn rust_props_new(config_ptr: *const u8, config_len: usize) -> *mut PropsEngine {
    panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let config = if config_ptr.is_null() || config_len == 0 {
            EngineConfig::default()
        } else {
            let bytes = match unsafe { validate_slice_args(config_ptr, config_len) } {
                Some(b) => b,
                None => return ptr::null_mut(),
            };
            match EngineConfig::from_toml_bytes(bytes) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, "rejecting engine config");
                    return ptr::null_mut();
                }
            }
        };
        let engine = PropsEngine::from_properties(config, &SystemProperties);
        Box::into_raw(Box::new(engine))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Free an engine returned by `rust_props_new`.
///
/// ```c
/// void rust_props_free(void *engine);
/// ```
///
/// # Safety
/// `engine` must come from `rust_props_new` and not have been freed already.
#[no_mangle]
pub unsafe extern "C" fn rust_props_free(engine: *mut PropsEngine) {
    if !engine.is_null() {
        let _ = panic::catch_unwind(panic::AssertUnwindSafe(|| unsafe {
            drop(Box::from_raw(engine));
        }));
    }
}

/// Apply overrides for the launching package.
///
/// A null `package_ptr` means the package is unknown and nothing is written.
/// `incremental_ptr`/`incremental_len` carry the live build incremental.
/// Returns the number of fields written, or -1 on invalid arguments or panic.
///
/// ```c
/// typedef int32_t (*rust_props_setter)(void *user_data, const char *field, const char *value);
///
/// int32_t rust_props_apply(const void *engine,
///                          const uint8_t *package_ptr, size_t package_len,
///                          const uint8_t *incremental_ptr, size_t incremental_len,
///                          rust_props_setter setter,
///                          void *user_data);
/// ```
///
/// # Safety
/// `engine` must be a live engine. String pointers must point to their
/// lengths of valid UTF-8 bytes, or be null. `setter` must be safe to call
/// with `user_data` for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn rust_props_apply(
    engine: *const PropsEngine,
    package_ptr: *const u8,
    package_len: usize,
    incremental_ptr: *const u8,
    incremental_len: usize,
    setter: Option<FieldSetter>,
    user_data: *mut c_void,
) -> i32 {
    panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let engine = match unsafe { engine.as_ref() } {
            Some(e) => e,
            None => return -1,
        };
        let setter = match setter {
            Some(s) => s,
            None => return -1,
        };
        let package = match unsafe { optional_str(package_ptr, package_len) } {
            Some(p) => p,
            None => return -1,
        };
        let incremental = match unsafe { optional_str(incremental_ptr, incremental_len) } {
            Some(i) => i.unwrap_or_default().to_string(),
            None => return -1,
        };

        let mut surface = CallbackSurface {
            setter,
            user_data,
            incremental,
        };
        let report = engine.apply_overrides_for(package, &mut surface);
        i32::try_from(report.written.len()).unwrap_or(i32::MAX)
    }))
    .unwrap_or(-1)
}

/// Whether the certificate chain request must be denied.
///
/// `frames` holds `frame_count` NUL-terminated class names of the active call
/// chain; null entries are skipped. When this returns true the caller throws
/// `UnsupportedOperationException`.
///
/// ```c
/// bool rust_props_should_block(const void *engine, const char *const *frames, size_t frame_count);
/// ```
///
/// # Safety
/// `engine` must be a live engine; `frames` must point to `frame_count`
/// pointers, each null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn rust_props_should_block(
    engine: *const PropsEngine,
    frames: *const *const c_char,
    frame_count: usize,
) -> bool {
    panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let engine = match unsafe { engine.as_ref() } {
            Some(e) => e,
            None => return false,
        };
        let frames = match unsafe { validate_slice_args(frames, frame_count) } {
            Some(f) => f,
            None => return false,
        };
        let frames = frames
            .iter()
            .filter(|name| !name.is_null())
            .map(|&name| {
                // SAFETY: non-null entries are valid C strings per the contract.
                let name = unsafe { CStr::from_ptr(name) };
                FrameDescriptor::new(name.to_string_lossy())
            })
            .collect();
        engine.should_block_attestation(&InvocationContext::new(frames))
    }))
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Writes {
        entries: Vec<(String, String)>,
        deny: Option<&'static str>,
    }

    unsafe extern "C" fn record(user_data: *mut c_void, field: *const c_char, value: *const c_char) -> i32 {
        let writes = unsafe { &mut *(user_data as *mut Writes) };
        let field = unsafe { CStr::from_ptr(field) }.to_string_lossy().into_owned();
        let value = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();
        if writes.deny == Some(field.as_str()) {
            return 13;
        }
        writes.entries.push((field, value));
        SET_OK
    }

    fn apply(engine: *const PropsEngine, package: Option<&str>, writes: &mut Writes) -> i32 {
        let (pkg_ptr, pkg_len) = match package {
            Some(p) => (p.as_ptr(), p.len()),
            None => (ptr::null(), 0),
        };
        let incremental = "8675309";
        unsafe {
            rust_props_apply(
                engine,
                pkg_ptr,
                pkg_len,
                incremental.as_ptr(),
                incremental.len(),
                Some(record),
                writes as *mut Writes as *mut c_void,
            )
        }
    }

    /// `rust_props_apply` as declared in its C prototype, slot for slot.
    type ApplyPrototype = unsafe extern "C" fn(
        *const PropsEngine,
        *const u8,
        usize,
        *const u8,
        usize,
        Option<FieldSetter>,
        *mut c_void,
    ) -> i32;

    #[test]
    fn test_ffi_apply_matches_c_prototype() {
        let apply: ApplyPrototype = rust_props_apply;
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let package = "com.google.android.settings.intelligence";
        let incremental = "4242";
        let mut writes = Writes::default();
        let written = unsafe {
            apply(
                engine,
                package.as_ptr(),
                package.len(),
                incremental.as_ptr(),
                incremental.len(),
                Some(record),
                &mut writes as *mut Writes as *mut c_void,
            )
        };
        assert_eq!(written, 6);
        assert_eq!(
            writes.entries.last(),
            Some(&("FINGERPRINT".to_string(), "4242".to_string()))
        );
        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_default_engine_applies_profile() {
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        assert!(!engine.is_null());

        let mut writes = Writes::default();
        assert_eq!(apply(engine, Some("com.android.chrome"), &mut writes), 6);
        assert_eq!(writes.entries[0], ("BRAND".to_string(), "google".to_string()));
        assert_eq!(writes.entries[4], ("MODEL".to_string(), "Pixel 6 Pro".to_string()));

        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_settings_intelligence_gets_incremental() {
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let mut writes = Writes::default();
        assert_eq!(
            apply(engine, Some("com.google.android.settings.intelligence"), &mut writes),
            6
        );
        assert_eq!(
            writes.entries.last(),
            Some(&("FINGERPRINT".to_string(), "8675309".to_string()))
        );
        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_null_package_is_noop() {
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let mut writes = Writes::default();
        assert_eq!(apply(engine, None, &mut writes), 0);
        assert!(writes.entries.is_empty());
        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_denied_write_is_skipped() {
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let mut writes = Writes {
            deny: Some("DEVICE"),
            ..Writes::default()
        };
        assert_eq!(apply(engine, Some("com.google.android.youtube"), &mut writes), 5);
        assert!(writes.entries.iter().all(|(f, _)| f != "DEVICE"));
        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_invalid_arguments() {
        let mut writes = Writes::default();
        assert_eq!(apply(ptr::null(), Some("com.android.chrome"), &mut writes), -1);

        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let pkg = "com.android.chrome";
        let rc = unsafe {
            rust_props_apply(engine, pkg.as_ptr(), pkg.len(), ptr::null(), 0, None, ptr::null_mut())
        };
        assert_eq!(rc, -1);

        let bad = [0xffu8, 0xfe];
        let rc = unsafe {
            rust_props_apply(
                engine,
                bad.as_ptr(),
                bad.len(),
                ptr::null(),
                0,
                Some(record),
                &mut writes as *mut Writes as *mut c_void,
            )
        };
        assert_eq!(rc, -1);
        assert!(writes.entries.is_empty());
        unsafe { rust_props_free(engine) };
    }

    #[test]
    fn test_ffi_config_from_toml() {
        let config = b"[profiles.cod]\nMODEL = \"SM-S918B\"\n";
        let engine = unsafe { rust_props_new(config.as_ptr(), config.len()) };
        assert!(!engine.is_null());
        let cod = unsafe { &*engine }.config().profiles.cod.get(IdentityField::Model);
        assert_eq!(cod, Some("SM-S918B"));
        unsafe { rust_props_free(engine) };

        let broken = b"[profiles.cod]\nSERIAL = 1\n";
        let engine = unsafe { rust_props_new(broken.as_ptr(), broken.len()) };
        assert!(engine.is_null());
    }

    #[test]
    fn test_ffi_guard() {
        let engine = unsafe { rust_props_new(ptr::null(), 0) };
        let droidguard = CString::new("com.google.android.gms.droidguard.DroidGuardChimeraService").unwrap();
        let keystore = CString::new("android.security.keystore2.AndroidKeyStoreSpi").unwrap();
        let frames = [keystore.as_ptr(), ptr::null(), droidguard.as_ptr()];

        let blocked = unsafe { rust_props_should_block(engine, frames.as_ptr(), frames.len()) };
        assert!(!blocked, "guard must stay off before GMS is seen");

        let mut writes = Writes::default();
        apply(engine, Some("com.google.android.gms"), &mut writes);

        let blocked = unsafe { rust_props_should_block(engine, frames.as_ptr(), frames.len()) };
        assert!(blocked);
        let blocked = unsafe { rust_props_should_block(engine, frames.as_ptr(), 1) };
        assert!(!blocked);
        assert!(!unsafe { rust_props_should_block(ptr::null(), frames.as_ptr(), frames.len()) });
        assert!(!unsafe { rust_props_should_block(engine, ptr::null(), 0) });

        unsafe { rust_props_free(engine) };
    }
}
