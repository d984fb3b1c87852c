use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::ChannelError;
use crate::request::RunKey;

use super::events::TransferEvent;

/// Locking, metadata and pub/sub for runs.
///
/// Keys passed in are already namespaced (see [`RunKey::lock_name`],
/// [`RunKey::meta_name`] and [`RunKey::channel_name`]).
pub trait ProgressChannel: Send + Sync {
    /// Set-if-absent with expiry. True when this caller now holds the lock.
    fn acquire_lock(&self, key: &str, ttl: Duration) -> Result<bool, ChannelError>;

    /// Unconditional delete.
    fn release_lock(&self, key: &str) -> Result<(), ChannelError>;

    /// Merges `fields` into the snapshot and restarts its retention.
    fn save_meta(&self, key: &str, fields: Map<String, Value>) -> Result<(), ChannelError>;

    /// Last snapshot, empty when none was saved or it expired.
    fn get_meta(&self, key: &str) -> Result<Map<String, Value>, ChannelError>;

    /// Fire-and-forget; messages are dropped when nobody listens.
    fn publish(&self, key: &str, message: String) -> Result<(), ChannelError>;

    fn subscribe(&self, key: &str) -> Result<broadcast::Receiver<String>, ChannelError>;

    /// Forgets the topic once its last receiver is gone.
    fn release_topic(&self, key: &str) -> Result<(), ChannelError>;
}

/// Saves the event as the run's snapshot, then broadcasts it.
pub fn emit(
    channel: &dyn ProgressChannel,
    key: &RunKey,
    event: &TransferEvent,
) -> Result<(), ChannelError> {
    let value = serde_json::to_value(event)?;
    if let Value::Object(fields) = &value {
        channel.save_meta(&key.meta_name(), fields.clone())?;
    }
    channel.publish(&key.channel_name(), value.to_string())
}
