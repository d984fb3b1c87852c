//! In-process [`ProgressChannel`] backed by moka TTL caches and tokio
//! broadcast topics.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::ChannelError;

use super::channel::ProgressChannel;

#[derive(Debug, Clone)]
struct LockEntry {
    ttl: Duration,
}

/// Each lock expires after the TTL it was acquired with.
struct LockExpiry;

impl Expiry<String, LockEntry> for LockExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LockEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct InMemoryChannel {
    locks: Cache<String, LockEntry>,
    meta: Cache<String, Map<String, Value>>,
    /// Serializes read-merge-write on `meta`.
    meta_merge: Mutex<()>,
    topics: RwLock<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl InMemoryChannel {
    pub fn new(meta_ttl: Duration, capacity: usize) -> Self {
        Self {
            locks: Cache::builder().expire_after(LockExpiry).build(),
            meta: Cache::builder().time_to_live(meta_ttl).build(),
            meta_merge: Mutex::new(()),
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().map(|t| t.len()).unwrap_or(0)
    }
}

impl ProgressChannel for InMemoryChannel {
    fn acquire_lock(&self, key: &str, ttl: Duration) -> Result<bool, ChannelError> {
        let entry = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| LockEntry { ttl });
        Ok(entry.is_fresh())
    }

    fn release_lock(&self, key: &str) -> Result<(), ChannelError> {
        self.locks.invalidate(key);
        Ok(())
    }

    fn save_meta(&self, key: &str, fields: Map<String, Value>) -> Result<(), ChannelError> {
        if fields.is_empty() {
            return Ok(());
        }
        let _guard = self
            .meta_merge
            .lock()
            .map_err(|_| ChannelError::LockPoisoned)?;
        let mut snapshot = self.meta.get(key).unwrap_or_default();
        snapshot.extend(fields);
        self.meta.insert(key.to_string(), snapshot);
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Map<String, Value>, ChannelError> {
        Ok(self.meta.get(key).unwrap_or_default())
    }

    fn publish(&self, key: &str, message: String) -> Result<(), ChannelError> {
        let topics = self.topics.read().map_err(|_| ChannelError::LockPoisoned)?;
        if let Some(tx) = topics.get(key) {
            // No receivers is not an error.
            let _ = tx.send(message);
        }
        Ok(())
    }

    fn subscribe(&self, key: &str) -> Result<broadcast::Receiver<String>, ChannelError> {
        let mut topics = self.topics.write().map_err(|_| ChannelError::LockPoisoned)?;
        let tx = topics
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(tx.subscribe())
    }

    fn release_topic(&self, key: &str) -> Result<(), ChannelError> {
        let mut topics = match self.topics.write() {
            Ok(topics) => topics,
            Err(poisoned) => {
                log::warn!("Topic map lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if topics.get(key).is_some_and(|tx| tx.receiver_count() == 0) {
            topics.remove(key);
        }
        Ok(())
    }
}
