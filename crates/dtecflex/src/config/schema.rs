use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Local root holding `{abbr}/{prefix}{date}/` media directories.
    #[serde(default = "default_media_base")]
    pub media_base: String,
    /// Root of the same layout on the remote host.
    #[serde(default = "default_remote_base")]
    pub remote_base: String,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

fn default_database_path() -> String {
    "~/.dtecflex/data/dtecflex.db".to_string()
}

fn default_media_base() -> String {
    "/media/noticias_www".to_string()
}

fn default_remote_base() -> String {
    "/mnt/dtecflex-site-root".to_string()
}

/// How files reach the remote base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// rsync over ssh with key authentication.
    Rsync(SshConfig),
    /// The remote base is a locally mounted filesystem.
    Local,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig::Rsync(SshConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshConfig {
    #[serde(default = "default_ssh_user")]
    pub user: String,
    #[serde(default = "default_ssh_host")]
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_ssh_key_path")]
    pub key_path: String,
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

fn default_ssh_host() -> String {
    "dtec-flex.com.br".to_string()
}

fn default_ssh_port() -> u16 {
    8022
}

fn default_ssh_key_path() -> String {
    "~/.ssh/id_rsa".to_string()
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            host: default_ssh_host(),
            port: default_ssh_port(),
            key_path: default_ssh_key_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsertionMode {
    /// Entity rows are published inside the transfer loop.
    #[default]
    Inline,
    /// Each transferred record becomes a unit on the insert worker pool.
    Queued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub mode: InsertionMode,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Upper bound for one queued insertion unit.
    #[serde(default = "default_insert_time_limit")]
    pub insert_time_limit_secs: u64,
}

fn default_chunk_size() -> usize {
    50
}

fn default_worker_count() -> usize {
    num_cpus::get().min(4)
}

fn default_insert_time_limit() -> u64 {
    300
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            mode: InsertionMode::default(),
            worker_count: default_worker_count(),
            insert_time_limit_secs: default_insert_time_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Run lock expiry.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    /// Retention of the per-run metadata snapshot.
    #[serde(default = "default_meta_ttl")]
    pub meta_ttl_secs: u64,
    /// Checked between records; exceeding it fails the run.
    #[serde(default = "default_soft_time_limit")]
    pub soft_time_limit_secs: u64,
    /// Enforced by the dispatcher even if the run never returns.
    #[serde(default = "default_hard_time_limit")]
    pub hard_time_limit_secs: u64,
    /// Retention of finished job statuses.
    #[serde(default = "default_result_retention")]
    pub result_retention_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_lock_ttl() -> u64 {
    60 * 45
}

fn default_meta_ttl() -> u64 {
    60 * 90
}

fn default_soft_time_limit() -> u64 {
    60 * 30
}

fn default_hard_time_limit() -> u64 {
    60 * 35
}

fn default_result_retention() -> u64 {
    60 * 60
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl(),
            meta_ttl_secs: default_meta_ttl(),
            soft_time_limit_secs: default_soft_time_limit(),
            hard_time_limit_secs: default_hard_time_limit(),
            result_retention_secs: default_result_retention(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Config {
    /// A config with every default applied.
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: default_database_path(),
            media_base: default_media_base(),
            remote_base: default_remote_base(),
            remote: RemoteConfig::default(),
            publish: PublishConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.media_base, "/media/noticias_www");
        assert_eq!(config.remote_base, "/mnt/dtecflex-site-root");
        assert_eq!(config.publish.chunk_size, 50);
        assert_eq!(config.publish.mode, InsertionMode::Inline);
        assert_eq!(config.jobs.lock_ttl_secs, 2700);
        assert_eq!(config.jobs.meta_ttl_secs, 5400);
        assert_eq!(config.jobs.soft_time_limit_secs, 1800);
        assert_eq!(config.jobs.result_retention_secs, 3600);
        match config.remote {
            RemoteConfig::Rsync(ssh) => {
                assert_eq!(ssh.port, 8022);
                assert_eq!(ssh.user, "ubuntu");
            }
            RemoteConfig::Local => panic!("expected rsync default"),
        }
    }

    #[test]
    fn test_remote_transport_tag() {
        let config: Config = serde_json::from_str(
            r#"{"version": "1.0", "remote": {"transport": "local"}}"#,
        )
        .unwrap();
        assert_eq!(config.remote, RemoteConfig::Local);

        let config: Config = serde_json::from_str(
            r#"{"version": "1.0", "remote": {"transport": "rsync", "host": "example.org", "port": 22}}"#,
        )
        .unwrap();
        match config.remote {
            RemoteConfig::Rsync(ssh) => {
                assert_eq!(ssh.host, "example.org");
                assert_eq!(ssh.port, 22);
                assert_eq!(ssh.user, "ubuntu");
            }
            RemoteConfig::Local => panic!("expected rsync"),
        }
    }

    #[test]
    fn test_queued_mode() {
        let config: Config = serde_json::from_str(
            r#"{"version": "1.0", "publish": {"mode": "queued", "worker_count": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.publish.mode, InsertionMode::Queued);
        assert_eq!(config.publish.worker_count, 2);
    }
}
