use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use crate::config::types::Config;
use crate::ConfigError;

/// Loads configuration from a TOML file with environment variable overrides
///
/// Environment variables use the `KAGAMI_` prefix with `__` as the section
/// separator, e.g. `KAGAMI_DATABASE__PATH`, `KAGAMI_COOLDOWN`,
/// `KAGAMI_RETRY_COUNT`. A missing file falls back to environment variables
/// and built-in defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::warn!(
            "Config file {} not found, falling back to environment variables",
            path.display()
        );
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("KAGAMI_").split("__"))
        .extract()?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.retry_count == 0 {
        return Err(ConfigError::Validation(
            "retry_count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(
            r#"
cooldown = 5
retry_count = 2

[database]
path = "./mirror.db"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cooldown, 5);
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.database.path.to_str(), Some("./mirror.db"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/kagami.toml")).unwrap();
        assert_eq!(config.cooldown, 3);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.database.path.to_str(), Some("kagami.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = create_temp_config("cooldown = 1\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cooldown, 1);
        assert_eq!(config.retry_count, 3);
    }

    #[test]
    fn test_zero_retry_count_rejected() {
        let file = create_temp_config("retry_count = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
