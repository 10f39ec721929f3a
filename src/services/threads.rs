use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::Message;
use crate::notify::{Notifier, RenderIntent, RoomEvent};
use crate::store::{ChangeOp, TimelineStore};

/// Root a reply target resolves to. Attaching to a child lands on that
/// child's root, which keeps the tree at two levels.
pub(crate) async fn resolve_effective_parent(
    store: &dyn TimelineStore,
    room_id: Uuid,
    target_id: Uuid,
) -> AppResult<Option<Message>> {
    let Some(target) = store.find_in_room(room_id, target_id).await? else {
        return Ok(None);
    };
    match target.ancestry_root_id {
        None => Ok(Some(target)),
        Some(root_id) => store.find_in_room(room_id, root_id).await,
    }
}

/// Reload a root and tell subscribers its visible reply count is stale.
/// Best effort: the parent may already be gone.
pub(crate) async fn refresh_reply_count(
    store: &dyn TimelineStore,
    notifier: &dyn Notifier,
    parent_id: Uuid,
) {
    match store.find(parent_id).await {
        Ok(Some(parent)) => {
            notifier
                .notify(RoomEvent::Replaced {
                    room_id: parent.room_id,
                    message: parent,
                    intent: RenderIntent::ReplyCount,
                })
                .await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(parent_id = %parent_id, error = %e, "failed to reload parent for reply count refresh");
        }
    }
}

/// The ancestry engine. Maintains the two-level reply tree: a message is
/// either a root or a direct child of a root, never deeper.
pub struct ThreadService {
    store: Arc<dyn TimelineStore>,
    notifier: Arc<dyn Notifier>,
}

impl ThreadService {
    pub fn new(store: Arc<dyn TimelineStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Attach a message under a thread. The requested parent may itself be
    /// a child, in which case attachment is redirected to its root. Any
    /// children the attached message had are re-pointed to the same
    /// effective parent rather than staying under a message that is no
    /// longer a root.
    pub async fn attach(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        target_parent_id: Uuid,
    ) -> AppResult<Message> {
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if message.id == target_parent_id {
            return Err(AppError::InvalidOperation(
                "cannot attach a message to itself".into(),
            ));
        }

        let parent = resolve_effective_parent(self.store.as_ref(), room_id, target_parent_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if parent.id == message.id {
            return Err(AppError::InvalidOperation(
                "cannot attach a message beneath its own thread".into(),
            ));
        }
        if message.parent_id == Some(parent.id) {
            // Retried attach, nothing to change.
            return Ok(message);
        }

        let old_parent_id = message.parent_id;
        let mut ops = vec![
            ChangeOp::RepointChildren {
                from: message.id,
                to: parent.id,
            },
            ChangeOp::SetParent {
                id: message.id,
                parent_id: Some(parent.id),
            },
            ChangeOp::Touch { id: parent.id },
        ];
        if let Some(old) = old_parent_id {
            ops.push(ChangeOp::Touch { id: old });
        }
        self.store.apply(ops).await?;

        let mut updated = message;
        updated.parent_id = Some(parent.id);
        updated.ancestry_root_id = Some(parent.id);

        refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), parent.id).await;
        if let Some(old) = old_parent_id {
            refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), old).await;
        }
        self.notifier
            .notify(RoomEvent::ThreadChanged {
                room_id,
                message: updated.clone(),
                old_parent_id,
                new_parent_id: Some(parent.id),
            })
            .await;

        Ok(updated)
    }

    /// Detach a message back into the root timeline. Detaching a root is a
    /// no-op, so retries are safe.
    pub async fn detach(&self, room_id: Uuid, message_id: Uuid) -> AppResult<Message> {
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let Some(old_parent_id) = message.parent_id else {
            return Ok(message);
        };

        self.store
            .apply(vec![
                ChangeOp::SetParent {
                    id: message.id,
                    parent_id: None,
                },
                ChangeOp::Touch { id: old_parent_id },
            ])
            .await?;

        let mut updated = message;
        updated.parent_id = None;
        updated.ancestry_root_id = None;

        refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), old_parent_id).await;
        self.notifier
            .notify(RoomEvent::ThreadChanged {
                room_id,
                message: updated.clone(),
                old_parent_id: Some(old_parent_id),
                new_parent_id: None,
            })
            .await;

        Ok(updated)
    }

    /// Delete a message. Children of a deleted root are promoted to roots
    /// rather than deleted; the former parent of a deleted child gets its
    /// reply count refreshed. Siblings are never affected.
    pub async fn destroy(&self, room_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut ops = vec![
            ChangeOp::PromoteChildren { of: message.id },
            ChangeOp::Delete { id: message.id },
        ];
        if let Some(parent_id) = message.parent_id {
            ops.push(ChangeOp::Touch { id: parent_id });
        }
        self.store.apply(ops).await?;
        metrics::MESSAGES_DELETED.inc();

        self.notifier
            .notify(RoomEvent::Removed {
                room_id: message.room_id,
                message_id: message.id,
            })
            .await;
        if let Some(parent_id) = message.parent_id {
            refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), parent_id).await;
        }

        Ok(())
    }
}
