use dashmap::DashMap;
use log::debug;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::constants::STREAM_CHANNEL_CAPACITY;

/// Per-user realtime fan-out over tokio broadcast channels. Subscribers
/// that lag past the channel capacity drop oldest-first; the notification
/// row remains the durable record.
pub struct StreamBroker {
    channels: DashMap<String, broadcast::Sender<Value>>,
}

impl StreamBroker {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Value> {
        self.channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(STREAM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a payload to a user's stream. Returns the number of
    /// subscribers that received it; zero when nobody is listening.
    pub fn publish(&self, user_id: &str, payload: Value) -> usize {
        let reached = self
            .channels
            .get(user_id)
            .and_then(|sender| sender.send(payload).ok())
            .unwrap_or(0);
        debug!("Realtime publish for user {} reached {} subscribers", user_id, reached);
        reached
    }
}

impl Default for StreamBroker {
    fn default() -> Self {
        Self::new()
    }
}
