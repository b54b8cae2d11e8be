//! Invocation context handed to the attestation guard.
//!
//! The host's instrumentation captures the active frames when a certificate
//! chain is requested; the engine only looks for the integrity subsystem's
//! marker in their class names.

/// Class name fragment identifying the DroidGuard integrity runtime.
pub const INTEGRITY_MARKER: &str = "DroidGuard";

/// One active invocation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub class_name: String,
}

impl FrameDescriptor {
    pub fn new(class_name: impl Into<String>) -> Self {
        FrameDescriptor {
            class_name: class_name.into(),
        }
    }
}

/// The chain of frames active when the guard is consulted, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    frames: Vec<FrameDescriptor>,
}

impl InvocationContext {
    pub fn new(frames: Vec<FrameDescriptor>) -> Self {
        InvocationContext { frames }
    }

    pub fn from_class_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InvocationContext {
            frames: names.into_iter().map(FrameDescriptor::new).collect(),
        }
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    /// True if any frame originates from the integrity subsystem.
    pub fn from_integrity_subsystem(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.class_name.contains(INTEGRITY_MARKER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_anywhere_in_chain() {
        let ctx = InvocationContext::from_class_names([
            "android.security.keystore2.AndroidKeyStoreSpi",
            "com.google.android.gms.droidguard.loader.DroidGuardHandle",
            "java.lang.Thread",
        ]);
        assert!(ctx.from_integrity_subsystem());
        assert_eq!(ctx.frames().len(), 3);
    }

    #[test]
    fn test_marker_is_case_sensitive_substring() {
        let ctx = InvocationContext::from_class_names(["com.example.droidguard.Impl"]);
        assert!(!ctx.from_integrity_subsystem());

        let ctx = InvocationContext::from_class_names(["xDroidGuardy"]);
        assert!(ctx.from_integrity_subsystem());
    }

    #[test]
    fn test_empty_context() {
        assert!(!InvocationContext::default().from_integrity_subsystem());
    }
}
