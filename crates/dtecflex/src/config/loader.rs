use std::path::{Path, PathBuf};

use crate::config::schema::{Config, RemoteConfig};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variables that override file values, in the spirit of a
/// deployment `.env`.
pub const ENV_DATABASE_PATH: &str = "DTECFLEX_DATABASE_PATH";
pub const ENV_MEDIA_BASE: &str = "DTECFLEX_MEDIA_BASE";
pub const ENV_REMOTE_BASE: &str = "DTECFLEX_REMOTE_BASE";
pub const ENV_SSH_USER: &str = "DTECFLEX_SSH_USER";
pub const ENV_SSH_HOST: &str = "DTECFLEX_SSH_HOST";
pub const ENV_SSH_PORT: &str = "DTECFLEX_SSH_PORT";
pub const ENV_SSH_KEY_PATH: &str = "DTECFLEX_SSH_KEY_PATH";

/// Reads, validates and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse_and_check_schema(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates a config document without consulting the environment.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config = parse_and_check_schema(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_and_check_schema(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    validate_schema(&json_value)?;
    Ok(serde_json::from_value(json_value)?)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Overrides file values with whatever `lookup` returns for the `DTECFLEX_*`
/// names. Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_DATABASE_PATH) {
        config.database_path = v;
    }
    if let Some(v) = get(ENV_MEDIA_BASE) {
        config.media_base = v;
    }
    if let Some(v) = get(ENV_REMOTE_BASE) {
        config.remote_base = v;
    }

    if let RemoteConfig::Rsync(ssh) = &mut config.remote {
        if let Some(v) = get(ENV_SSH_USER) {
            ssh.user = v;
        }
        if let Some(v) = get(ENV_SSH_HOST) {
            ssh.host = v;
        }
        if let Some(v) = get(ENV_SSH_PORT) {
            ssh.port = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_SSH_PORT.to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = get(ENV_SSH_KEY_PATH) {
            ssh.key_path = v;
        }
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.media_base.trim().is_empty() || config.remote_base.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "media_base and remote_base must not be empty".to_string(),
        });
    }

    if config.publish.chunk_size == 0 {
        return Err(ConfigError::Validation {
            message: "publish.chunk_size must be greater than 0".to_string(),
        });
    }

    if config.publish.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "publish.worker_count must be greater than 0".to_string(),
        });
    }

    if config.jobs.hard_time_limit_secs < config.jobs.soft_time_limit_secs {
        return Err(ConfigError::Validation {
            message: format!(
                "jobs.hard_time_limit_secs ({}) is below jobs.soft_time_limit_secs ({})",
                config.jobs.hard_time_limit_secs, config.jobs.soft_time_limit_secs
            ),
        });
    }

    if config.jobs.lock_ttl_secs == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.lock_ttl_secs must be greater than 0".to_string(),
        });
    }

    if let RemoteConfig::Rsync(ssh) = &config.remote {
        if ssh.user.trim().is_empty() || ssh.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "remote.user and remote.host are required for rsync".to_string(),
            });
        }
    }

    Ok(())
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    const VALID: &str = r#"{
        "version": "1.0",
        "database_path": "/tmp/dtecflex.db",
        "media_base": "/media/noticias_www",
        "remote_base": "/mnt/site",
        "remote": {"transport": "rsync", "user": "deploy", "host": "files.example.org", "port": 8022, "key_path": "/keys/id"},
        "publish": {"chunk_size": 25, "mode": "inline"},
        "jobs": {"lock_ttl_secs": 60}
    }"#;

    #[test]
    fn test_load_valid_config() {
        let config = load_config_from_str(VALID).unwrap();
        assert_eq!(config.publish.chunk_size, 25);
        assert_eq!(config.jobs.lock_ttl_secs, 60);
        assert_eq!(config.remote_base, "/mnt/site");
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { .. } | ConfigError::SchemaValidation { .. }
        ));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err =
            load_config_from_str(r#"{"version": "1.0", "publish": {"chunk_size": 0}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { .. } | ConfigError::SchemaValidation { .. }
        ));
    }

    #[test]
    fn test_rejects_unknown_transport() {
        let err = load_config_from_str(r#"{"version": "1.0", "remote": {"transport": "ftp"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_rejects_hard_limit_below_soft_limit() {
        let err = load_config_from_str(
            r#"{"version": "1.0", "jobs": {"soft_time_limit_secs": 100, "hard_time_limit_secs": 50}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = load_config_from_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_env_overrides_with_lookup() {
        let mut config = load_config_from_str(VALID).unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_MEDIA_BASE, "/srv/media"),
            (ENV_SSH_HOST, "other.example.org"),
            (ENV_SSH_PORT, "2222"),
            (ENV_REMOTE_BASE, "  "),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.media_base, "/srv/media");
        assert_eq!(config.remote_base, "/mnt/site");
        match &config.remote {
            RemoteConfig::Rsync(ssh) => {
                assert_eq!(ssh.host, "other.example.org");
                assert_eq!(ssh.port, 2222);
                assert_eq!(ssh.user, "deploy");
            }
            RemoteConfig::Local => panic!("expected rsync"),
        }
    }

    #[test]
    fn test_env_override_rejects_bad_port() {
        let mut config = load_config_from_str(VALID).unwrap();
        let err = apply_env_overrides(&mut config, |name| {
            (name == ENV_SSH_PORT).then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    #[serial]
    fn test_load_config_reads_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        std::env::set_var(ENV_SSH_USER, "operator");
        let result = load_config(&path);
        std::env::remove_var(ENV_SSH_USER);

        match result.unwrap().remote {
            RemoteConfig::Rsync(ssh) => assert_eq!(ssh.user, "operator"),
            RemoteConfig::Local => panic!("expected rsync"),
        }
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/dtecflex.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x/y.db"), home.join("x/y.db"));
        }
    }
}
