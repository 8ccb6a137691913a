//! Config path resolution

use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SNAPVIEW_CONFIG";

/// File name used when no override is set
pub const DEFAULT_CONFIG_FILE: &str = "snapview.toml";

/// Returns the core config path.
///
/// `$SNAPVIEW_CONFIG` if set and non-empty, otherwise `./snapview.toml`.
pub fn config_path() -> PathBuf {
    resolve_config_path(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn resolve_config_path(overridden: Option<PathBuf>) -> PathBuf {
    overridden
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        let path = resolve_config_path(None);
        assert!(path.ends_with("snapview.toml"));
        assert_eq!(resolve_config_path(Some(PathBuf::new())), path);
    }

    #[test]
    fn test_override_path() {
        let path = resolve_config_path(Some(PathBuf::from("/etc/snapview/core.toml")));
        assert_eq!(path, PathBuf::from("/etc/snapview/core.toml"));
    }
}
