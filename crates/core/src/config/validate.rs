use super::{types::Config, ConfigError};
use crate::layout::StrategyRegistry;
use crate::linker::normalize_path;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Library root and video extensions are set
/// - Monitor interval and polling tick are usable
/// - Retry policy allows at least one attempt
/// - Layout strategy is registered
/// - Movie root, when set, is separate from the library root
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.library.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "library.root cannot be empty".to_string(),
        ));
    }

    if config.library.video_extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "library.video_extensions cannot be empty".to_string(),
        ));
    }

    if config.monitor.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.interval_secs cannot be 0".to_string(),
        ));
    }

    if !(1..=1000).contains(&config.monitor.poll_tick_ms) {
        return Err(ConfigError::ValidationError(format!(
            "monitor.poll_tick_ms must be between 1 and 1000, got {}",
            config.monitor.poll_tick_ms
        )));
    }

    if config.daemon.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "daemon.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if let Some(movies_root) = &config.movies.root {
        if movies_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "movies.root cannot be empty".to_string(),
            ));
        }
        if normalize_path(movies_root) == normalize_path(&config.library.root) {
            return Err(ConfigError::ValidationError(
                "movies.root must differ from library.root".to_string(),
            ));
        }
    }

    let registry = StrategyRegistry::with_builtins();
    if !registry.contains(&config.library.strategy) {
        return Err(ConfigError::ValidationError(format!(
            "unknown layout strategy '{}' (available: {})",
            config.library.strategy,
            registry.names().join(", ")
        )));
    }

    Ok(())
}
