pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, expand_home, load_config, load_config_from_str};
pub use schema::{Config, InsertionMode, JobsConfig, PublishConfig, RemoteConfig, SshConfig};
