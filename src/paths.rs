//! Application path resolution
//!
//! The config file is taken from, in order:
//! - the `--config` flag (or `VMIX_REMOTE_CONFIG`)
//! - `vmix-remote.yaml` in the working directory, if present
//! - `vmix-remote.yaml` in the platform config dir (`~/.config/vMix Remote`,
//!   `%APPDATA%\vMix Remote`, ...)
//!
//! Logs go to a `logs` directory next to the config file.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "vMix Remote";

/// Config file name
pub const CONFIG_FILE: &str = "vmix-remote.yaml";

/// Application paths for config and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Resolve paths from an optional explicit config location.
    ///
    /// Note: This is called before logging is initialized.
    pub fn detect(explicit: Option<&Path>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let platform_dir = dirs::config_dir().map(|dir| dir.join(APP_NAME));
        Self::resolve(explicit, &cwd, platform_dir.as_deref())
    }

    fn resolve(explicit: Option<&Path>, cwd: &Path, platform_dir: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::beside(path.to_path_buf());
        }

        let local = cwd.join(CONFIG_FILE);
        if local.exists() {
            return Self::beside(local);
        }

        let base = platform_dir.unwrap_or(cwd);
        Self::beside(base.join(CONFIG_FILE))
    }

    fn beside(config: PathBuf) -> Self {
        let logs_dir = config
            .parent()
            .map(|p| p.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        Self { config, logs_dir }
    }

    /// Ensure the logs directory exists.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_wins() {
        let paths = AppPaths::resolve(
            Some(Path::new("/etc/vmix/custom.yaml")),
            Path::new("/tmp"),
            Some(Path::new("/home/op/.config/vMix Remote")),
        );
        assert_eq!(paths.config, PathBuf::from("/etc/vmix/custom.yaml"));
        assert_eq!(paths.logs_dir, PathBuf::from("/etc/vmix/logs"));
    }

    #[test]
    fn test_working_directory_config_preferred() {
        let cwd = TempDir::new().unwrap();
        std::fs::write(cwd.path().join(CONFIG_FILE), "").unwrap();

        let paths = AppPaths::resolve(None, cwd.path(), Some(Path::new("/nowhere")));
        assert_eq!(paths.config, cwd.path().join(CONFIG_FILE));
    }

    #[test]
    fn test_falls_back_to_platform_dir() {
        let cwd = TempDir::new().unwrap();
        let platform = TempDir::new().unwrap();

        let paths = AppPaths::resolve(None, cwd.path(), Some(platform.path()));
        assert_eq!(paths.config, platform.path().join(CONFIG_FILE));
        assert_eq!(paths.logs_dir, platform.path().join("logs"));

        paths.ensure_directories().unwrap();
        assert!(paths.logs_dir.is_dir());
    }
}
