use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Message;
use crate::notify::{Notifier, RoomEvent};
use crate::services::permissions::PermissionOracle;
use crate::store::{ChangeOp, TimelineStore};

use super::threads;

/// Relocates a message between rooms. The message leaves any thread it was
/// in, while its own direct children travel with it as one unit.
pub struct RoomMover {
    store: Arc<dyn TimelineStore>,
    notifier: Arc<dyn Notifier>,
    perms: Arc<dyn PermissionOracle>,
}

impl RoomMover {
    pub fn new(
        store: Arc<dyn TimelineStore>,
        notifier: Arc<dyn Notifier>,
        perms: Arc<dyn PermissionOracle>,
    ) -> Self {
        Self {
            store,
            notifier,
            perms,
        }
    }

    pub async fn move_to_room(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        target_room_id: Uuid,
        actor: Uuid,
    ) -> AppResult<Message> {
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !self.store.room_exists(target_room_id).await? {
            return Err(AppError::NotFound);
        }
        if !self.perms.is_member(actor, target_room_id).await? {
            return Err(AppError::Forbidden);
        }

        let old_parent_id = message.parent_id;
        let mut ops = Vec::new();
        if let Some(parent_id) = old_parent_id {
            // Thread membership does not survive a room change.
            ops.push(ChangeOp::SetParent {
                id: message.id,
                parent_id: None,
            });
            ops.push(ChangeOp::Touch { id: parent_id });
        }
        ops.push(ChangeOp::SetChildrenRoom {
            of: message.id,
            room_id: target_room_id,
        });
        ops.push(ChangeOp::SetRoom {
            id: message.id,
            room_id: target_room_id,
        });
        self.store.apply(ops).await?;

        let mut moved = message;
        moved.room_id = target_room_id;
        moved.parent_id = None;
        moved.ancestry_root_id = None;

        // From a subscriber's point of view the message disappears from the
        // source room and appears in the destination.
        self.notifier
            .notify(RoomEvent::Removed {
                room_id,
                message_id: moved.id,
            })
            .await;
        self.notifier
            .notify(RoomEvent::Created {
                room_id: target_room_id,
                message: moved.clone(),
            })
            .await;
        if let Some(parent_id) = old_parent_id {
            threads::refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), parent_id)
                .await;
        }

        Ok(moved)
    }
}
