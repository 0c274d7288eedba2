//! Configuration options for a mounted filesystem.

/// Options controlling how the filesystem is presented to the kernel.
///
/// # Example
///
/// ```ignore
/// let options = VfsOptions::default()
///     .with_fs_name("guidfs-scratch")
///     .with_allow_other(false);
/// ```
#[derive(Debug, Clone)]
pub struct VfsOptions {
    /// Filesystem name reported to the kernel.
    pub fs_name: String,

    /// Allow users other than the mounting one to access the mount.
    pub allow_other: bool,

    /// How long the kernel may cache attributes and entry lookups
    /// (seconds). Attributes carry synthetic "now" timestamps, so short
    /// values keep listings fresh.
    pub attr_timeout_secs: u64,
}

impl Default for VfsOptions {
    fn default() -> Self {
        Self {
            fs_name: "guidfs".to_string(),
            allow_other: true,
            attr_timeout_secs: 1,
        }
    }
}

impl VfsOptions {
    /// Set the filesystem name reported to the kernel.
    pub fn with_fs_name(mut self, fs_name: impl Into<String>) -> Self {
        self.fs_name = fs_name.into();
        self
    }

    /// Set whether other users may access the mount.
    pub fn with_allow_other(mut self, allow_other: bool) -> Self {
        self.allow_other = allow_other;
        self
    }

    /// Set the kernel attribute/entry cache timeout.
    pub fn with_attr_timeout_secs(mut self, secs: u64) -> Self {
        self.attr_timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts: VfsOptions = VfsOptions::default();
        assert_eq!(opts.fs_name, "guidfs");
        assert!(opts.allow_other);
        assert_eq!(opts.attr_timeout_secs, 1);
    }

    #[test]
    fn test_builder_pattern() {
        let opts: VfsOptions = VfsOptions::default()
            .with_fs_name("scratch")
            .with_allow_other(false)
            .with_attr_timeout_secs(60);

        assert_eq!(opts.fs_name, "scratch");
        assert!(!opts.allow_other);
        assert_eq!(opts.attr_timeout_secs, 60);
    }
}
