use std::path::{Path, PathBuf};

/// Filesystem roots the providers read from.
///
/// Production uses `/proc` and `/sys`; tests point these at a temporary
/// directory holding fixture files.
#[derive(Clone, Debug)]
pub struct HostPaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

impl HostPaths {
    /// Uses `root/proc` and `root/sys`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            proc_root: root.join("proc"),
            sys_root: root.join("sys"),
        }
    }

    pub fn proc(&self, relative: &str) -> PathBuf {
        self.proc_root.join(relative)
    }

    pub fn sys(&self, relative: &str) -> PathBuf {
        self.sys_root.join(relative)
    }
}
