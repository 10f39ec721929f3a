use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::Message;
use crate::notify::{Notifier, RenderIntent, RoomEvent};
use crate::store::{ChangeOp, NewMessage, TimelineStore};

use super::threads;

pub struct MessageService {
    store: Arc<dyn TimelineStore>,
    notifier: Arc<dyn Notifier>,
}

impl MessageService {
    pub fn new(store: Arc<dyn TimelineStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Post a message into a room, optionally as a reply. A reply target
    /// that is itself a child resolves to that child's root; a target that
    /// vanished mid-post degrades to a plain root message.
    pub async fn create(
        &self,
        room_id: Uuid,
        creator_id: Uuid,
        body: String,
        parent_id: Option<Uuid>,
    ) -> AppResult<Message> {
        if body.trim().is_empty() {
            return Err(AppError::BadRequest("message body cannot be empty".into()));
        }
        if !self.store.room_exists(room_id).await? {
            return Err(AppError::NotFound);
        }

        let mut message = self
            .store
            .insert(NewMessage {
                room_id,
                creator_id,
                body,
            })
            .await?;
        metrics::MESSAGES_CREATED.inc();

        let mut attached_parent = None;
        if let Some(target_id) = parent_id {
            if let Some(parent) =
                threads::resolve_effective_parent(self.store.as_ref(), room_id, target_id).await?
            {
                self.store
                    .apply(vec![
                        ChangeOp::SetParent {
                            id: message.id,
                            parent_id: Some(parent.id),
                        },
                        ChangeOp::Touch { id: parent.id },
                    ])
                    .await?;
                message.parent_id = Some(parent.id);
                message.ancestry_root_id = Some(parent.id);
                attached_parent = Some(parent.id);
            }
        }

        self.notifier
            .notify(RoomEvent::Created {
                room_id,
                message: message.clone(),
            })
            .await;
        if let Some(parent_id) = attached_parent {
            threads::refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), parent_id)
                .await;
        }

        Ok(message)
    }

    /// Edit a message body. Threading is untouched; no history is kept.
    pub async fn update_body(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        body: String,
    ) -> AppResult<Message> {
        if body.trim().is_empty() {
            return Err(AppError::BadRequest("message body cannot be empty".into()));
        }
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.store
            .apply(vec![ChangeOp::SetBody {
                id: message.id,
                body: body.clone(),
            }])
            .await?;

        let mut updated = message;
        updated.body = body;

        self.notifier
            .notify(RoomEvent::Replaced {
                room_id,
                message: updated.clone(),
                intent: RenderIntent::Presentation,
            })
            .await;

        Ok(updated)
    }

    /// Advance the message's todo state one step along the cycle. No
    /// cascade: parents and children keep their own state.
    pub async fn toggle_todo(&self, room_id: Uuid, message_id: Uuid) -> AppResult<Message> {
        let message = self
            .store
            .find_in_room(room_id, message_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let next = message.todo_state.toggled();
        self.store
            .apply(vec![ChangeOp::SetTodoState {
                id: message.id,
                state: next,
            }])
            .await?;

        let mut updated = message;
        updated.todo_state = next;

        self.notifier
            .notify(RoomEvent::Replaced {
                room_id,
                message: updated.clone(),
                intent: RenderIntent::Presentation,
            })
            .await;

        Ok(updated)
    }
}
