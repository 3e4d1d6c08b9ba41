use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// `JELLYLINK_<SECTION>__<KEY>` environment overrides, e.g.
/// `JELLYLINK_LIBRARY__MOVIE_MIN_DURATION_SECS=3000`.
///
/// A double underscore separates nesting levels so keys may contain `_`.
fn env_overrides() -> Env {
    Env::prefixed("JELLYLINK_")
        .ignore(&["CONFIG"])
        .split("__")
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[library]
root = "/anime"

[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_from_str_missing_library() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        // Inside a jail so env overrides from other tests cannot leak in.
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[library]
root = "/srv/anime"
movie_min_duration_secs = 3000

[server]
host = "127.0.0.1"
port = 3000
"#,
            )?;

            let config = load_config(Path::new("config.toml")).unwrap();
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.server.host.to_string(), "127.0.0.1");
            assert_eq!(config.library.movie_min_duration_secs, 3000);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_keys_with_underscores() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[library]
root = "/srv/anime"
movie_min_duration_secs = 3000

[monitor]
interval_secs = 30
"#,
            )?;
            jail.set_env("JELLYLINK_CONFIG", "ignored.toml");
            jail.set_env("JELLYLINK_LIBRARY__MOVIE_MIN_DURATION_SECS", "1800");
            jail.set_env("JELLYLINK_MONITOR__INTERVAL_SECS", "5");
            jail.set_env("JELLYLINK_SERVER__PORT", "9100");

            let config = load_config(Path::new("config.toml")).unwrap();
            assert_eq!(config.library.movie_min_duration_secs, 1800);
            assert_eq!(config.monitor.interval_secs, 5);
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.library.root, Path::new("/srv/anime"));
            Ok(())
        });
    }
}
