//! Filesystem paths for the client data directory.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Well-known paths under the Crewgate data directory.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Resolve the default data directory at `~/.crewgate`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Config("Could not resolve home directory".to_string()))?;
        Ok(Self {
            root: home.join(".crewgate"),
        })
    }

    /// Build paths rooted at an explicit directory (tests, portable installs).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration file path.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Persisted session file path.
    pub fn session_file(&self) -> PathBuf {
        self.root.join("session.json")
    }

    /// Create the data directory if it does not exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_with_root() {
        let paths = Paths::with_root("/tmp/crewgate-test");
        assert_eq!(paths.root(), Path::new("/tmp/crewgate-test"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/crewgate-test/config.json")
        );
        assert_eq!(
            paths.session_file(),
            PathBuf::from("/tmp/crewgate-test/session.json")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_root() {
        let temp = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(temp.path().join("nested").join("data"));

        paths.ensure_dirs().unwrap();
        assert!(paths.root().is_dir());

        // Idempotent
        paths.ensure_dirs().unwrap();
    }
}
