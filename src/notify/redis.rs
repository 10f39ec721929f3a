use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client;
use uuid::Uuid;

use super::{Notifier, RoomEvent};
use crate::metrics;

fn channel_for_room(id: Uuid) -> String {
    format!("room:{}", id)
}

/// Publishes room events on Redis pub/sub channels, one channel per room.
/// The live-update fan-out service subscribes to `room:*` and forwards to
/// connected clients.
pub struct RedisNotifier {
    client: Client,
}

impl RedisNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn notify(&self, event: RoomEvent) {
        let payload = match event.to_broadcast_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, event = event.event_type(), "failed to serialize room event");
                metrics::BROADCAST_FAILURES.inc();
                return;
            }
        };
        let channel = channel_for_room(event.room_id());

        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                if let Err(e) = conn.publish::<_, _, ()>(channel, payload).await {
                    tracing::warn!(error = %e, event = event.event_type(), "failed to publish room event");
                    metrics::BROADCAST_FAILURES.inc();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to open redis connection for broadcast");
                metrics::BROADCAST_FAILURES.inc();
            }
        }
    }
}
