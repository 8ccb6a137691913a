//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::CoreConfig;

/// Filter directives for `config`, given the value of `RUST_LOG`
///
/// `RUST_LOG` wins when set; otherwise `debug = true` forces `debug`,
/// and the configured `log_filter` is used last.
pub fn filter_directives(config: &CoreConfig, rust_log: Option<&str>) -> String {
    match rust_log.filter(|directives| !directives.trim().is_empty()) {
        Some(directives) => directives.to_string(),
        None if config.debug => "debug".to_string(),
        None => config.log_filter.clone(),
    }
}

/// Install a fmt subscriber for `config`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(config: &CoreConfig) -> bool {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(config, rust_log.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        let mut config = CoreConfig::default();
        assert_eq!(filter_directives(&config, None), "info");
        assert_eq!(filter_directives(&config, Some("  ")), "info");

        config.debug = true;
        assert_eq!(filter_directives(&config, None), "debug");
        assert_eq!(
            filter_directives(&config, Some("snapview_core=trace")),
            "snapview_core=trace"
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = CoreConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
