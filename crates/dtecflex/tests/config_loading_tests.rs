//! Table-driven tests for configuration loading and validation.

use std::time::Duration;

use dtecflex::config::{load_config, load_config_from_str, InsertionMode, RemoteConfig};
use dtecflex::error::ConfigError;
use dtecflex::task::TaskLimits;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Ok,
    SchemaError,
    SemanticError,
}

struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    expect: Expect,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "minimal",
        config_json: r#"{ "version": "1.0" }"#,
        expect: Expect::Ok,
    },
    ConfigTestCase {
        name: "full_rsync",
        config_json: r#"{
            "version": "1.0",
            "database_path": "/var/lib/dtecflex/dtecflex.db",
            "media_base": "/media/noticias_www",
            "remote_base": "/mnt/dtecflex-site-root",
            "remote": { "transport": "rsync", "user": "ubuntu", "host": "example.org", "port": 8022, "key_path": "~/.ssh/id_rsa" },
            "publish": { "chunk_size": 100, "mode": "queued", "worker_count": 2, "insert_time_limit_secs": 60 },
            "jobs": { "lock_ttl_secs": 600, "soft_time_limit_secs": 300, "hard_time_limit_secs": 360 }
        }"#,
        expect: Expect::Ok,
    },
    ConfigTestCase {
        name: "local_transport",
        config_json: r#"{ "version": "1.0", "remote": { "transport": "local" } }"#,
        expect: Expect::Ok,
    },
    ConfigTestCase {
        name: "missing_version",
        config_json: r#"{ "media_base": "/m" }"#,
        expect: Expect::SchemaError,
    },
    ConfigTestCase {
        name: "unknown_transport",
        config_json: r#"{ "version": "1.0", "remote": { "transport": "ftp" } }"#,
        expect: Expect::SchemaError,
    },
    ConfigTestCase {
        name: "zero_chunk_size",
        config_json: r#"{ "version": "1.0", "publish": { "chunk_size": 0 } }"#,
        expect: Expect::SchemaError,
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0" }"#,
        expect: Expect::SemanticError,
    },
    ConfigTestCase {
        name: "hard_limit_below_soft_limit",
        config_json: r#"{ "version": "1.0", "jobs": { "soft_time_limit_secs": 600, "hard_time_limit_secs": 300 } }"#,
        expect: Expect::SemanticError,
    },
];

#[test]
fn test_config_cases() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        let actual = match &result {
            Ok(_) => Expect::Ok,
            Err(ConfigError::SchemaValidation { .. }) => Expect::SchemaError,
            Err(ConfigError::Validation { .. }) => Expect::SemanticError,
            Err(e) => panic!("{}: unexpected error kind: {}", case.name, e),
        };
        assert_eq!(actual, case.expect, "case '{}': {:?}", case.name, result.err());
    }
}

#[test]
fn test_defaults_mirror_production_values() {
    let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
    assert_eq!(config.media_base, "/media/noticias_www");
    assert_eq!(config.remote_base, "/mnt/dtecflex-site-root");
    assert_eq!(config.publish.chunk_size, 50);
    assert_eq!(config.publish.mode, InsertionMode::Inline);
    match &config.remote {
        RemoteConfig::Rsync(ssh) => assert_eq!(ssh.port, 8022),
        other => panic!("unexpected remote: {:?}", other),
    }

    let limits = TaskLimits::from(&config.jobs);
    assert_eq!(limits.lock_ttl, Duration::from_secs(45 * 60));
    assert_eq!(limits.soft_limit, Duration::from_secs(30 * 60));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "version": "1.0", "media_base": "/data/media", "remote": { "transport": "local" } }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.remote, RemoteConfig::Local);

    let err = load_config(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
