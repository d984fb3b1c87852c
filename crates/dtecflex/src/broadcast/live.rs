use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;

use crate::error::ChannelError;
use crate::request::RunKey;

use super::channel::ProgressChannel;

/// A live view of one run key: the last saved snapshot, if any, followed by
/// every event published after the feed was opened.
///
/// Dropping the feed releases its topic when no other feed shares it.
pub struct LiveFeed {
    channel: Arc<dyn ProgressChannel>,
    topic: String,
    snapshot: Option<String>,
    receiver: Option<Receiver<String>>,
}

impl LiveFeed {
    /// Subscribes before reading the snapshot so no event falls between the
    /// two.
    pub fn open(channel: Arc<dyn ProgressChannel>, key: &RunKey) -> Result<Self, ChannelError> {
        let topic = key.channel_name();
        let receiver = channel.subscribe(&topic)?;
        let mut meta = channel.get_meta(&key.meta_name())?;
        let snapshot = if meta.is_empty() {
            None
        } else {
            meta.insert("event".to_string(), Value::from("SNAPSHOT"));
            Some(Value::Object(meta).to_string())
        };
        Ok(Self {
            channel,
            topic,
            snapshot,
            receiver: Some(receiver),
        })
    }

    /// Next message if one is ready.
    pub fn try_next(&mut self) -> Option<String> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(snapshot);
        }
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Live feed lagged, {} event(s) skipped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Waits up to `timeout` for the next message.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.try_next() {
                return Some(message);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Async variant; `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<String> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(snapshot);
        }
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Live feed lagged, {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        drop(self.receiver.take());
        if let Err(e) = self.channel.release_topic(&self.topic) {
            log::warn!("Failed to release topic {}: {}", self.topic, e);
        }
    }
}
