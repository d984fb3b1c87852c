//! Isolated environment for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

use dtecflex::broadcast::{InMemoryChannel, LiveFeed, ProgressChannel};
use dtecflex::config::Config;
use dtecflex::db::Database;
use dtecflex::transfer::LocalMirror;
use dtecflex::TransferService;

use super::builders::ConfigBuilder;

/// Temp media and remote roots plus an in-memory database.
pub struct TestHarness {
    temp_dir: TempDir,
    pub media_base: PathBuf,
    pub remote_base: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let media_base = temp_dir.path().join("media");
        let remote_base = temp_dir.path().join("remote");
        std::fs::create_dir_all(&media_base).expect("Failed to create media dir");
        std::fs::create_dir_all(&remote_base).expect("Failed to create remote dir");

        Self {
            temp_dir,
            media_base,
            remote_base,
            db: Database::open_in_memory().expect("Failed to open database"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new(
            &self.media_base.to_string_lossy(),
            &self.remote_base.to_string_lossy(),
        )
    }

    /// Writes a media file under `{abbr}/{prefix}{date}/`.
    pub fn add_media_file(&self, abbreviation: &str, day_dir: &str, name: &str) -> PathBuf {
        let dir = self.media_base.join(abbreviation).join(day_dir);
        std::fs::create_dir_all(&dir).expect("Failed to create day dir");
        let path = dir.join(name);
        std::fs::write(&path, format!("content of {}", name)).expect("Failed to write media file");
        path
    }

    pub fn remote_file(&self, abbreviation: &str, day_dir: &str, name: &str) -> PathBuf {
        self.remote_base.join(abbreviation).join(day_dir).join(name)
    }

    /// Service with a shared channel so tests can open feeds directly.
    pub fn service(&self, config: &Config) -> (TransferService, Arc<InMemoryChannel>) {
        let channel = Arc::new(InMemoryChannel::new(Duration::from_secs(60), 256));
        let service = TransferService::with_parts(
            config,
            self.db.clone(),
            Arc::clone(&channel) as Arc<dyn ProgressChannel>,
            Arc::new(LocalMirror),
        )
        .expect("Failed to build service");
        (service, channel)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Every message currently buffered in the feed, parsed.
pub fn drain(feed: &mut LiveFeed) -> Vec<Value> {
    let mut events = Vec::new();
    while let Some(message) = feed.try_next() {
        events.push(serde_json::from_str(&message).expect("Event is not JSON"));
    }
    events
}
