use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::metrics;
use crate::notify::{Notifier, RoomEvent};
use crate::services::permissions::{AdministerTarget, PermissionOracle};
use crate::store::{ChangeOp, Partition, TimelineStore, TodoFilter};

use super::threads;

#[derive(Debug, Clone, Serialize)]
pub struct RetirementOutcome {
    pub deleted_count: usize,
    pub touched_parents: Vec<Uuid>,
}

impl RetirementOutcome {
    /// Distinguishes the empty-state rendering from a successful sweep.
    pub fn nothing_eligible(&self) -> bool {
        self.deleted_count == 0
    }
}

/// Permission-filtered batch deletion of messages by todo state, scoped to
/// a room's roots or one thread's children.
pub struct RetirementService {
    store: Arc<dyn TimelineStore>,
    notifier: Arc<dyn Notifier>,
    perms: Arc<dyn PermissionOracle>,
}

impl RetirementService {
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

    pub async fn retire_completed_todos(
        &self,
        scope: Partition,
        actor: Uuid,
    ) -> AppResult<RetirementOutcome> {
        self.retire(scope, TodoFilter::Completed, actor).await
    }

    pub async fn retire_non_todos(
        &self,
        scope: Partition,
        actor: Uuid,
    ) -> AppResult<RetirementOutcome> {
        self.retire(scope, TodoFilter::NotTodo, actor).await
    }

    async fn retire(
        &self,
        scope: Partition,
        filter: TodoFilter,
        actor: Uuid,
    ) -> AppResult<RetirementOutcome> {
        let candidates = self.store.todo_candidates(scope, filter).await?;

        // Non-administrable candidates are silently skipped rather than
        // failing the batch; a failed permission lookup counts as not
        // administrable.
        let mut eligible = Vec::new();
        for message in candidates {
            match self
                .perms
                .can_administer(actor, AdministerTarget::Message(&message))
                .await
            {
                Ok(true) => eligible.push(message),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(message_id = %message.id, error = %e, "skipping message after failed permission check");
                }
            }
        }

        if eligible.is_empty() {
            return Ok(RetirementOutcome {
                deleted_count: 0,
                touched_parents: Vec::new(),
            });
        }

        let mut touched: BTreeSet<Uuid> = BTreeSet::new();
        let mut ops = Vec::new();
        for message in &eligible {
            ops.push(ChangeOp::PromoteChildren { of: message.id });
            ops.push(ChangeOp::Delete { id: message.id });
            if let Some(parent_id) = message.parent_id {
                touched.insert(parent_id);
            }
        }
        for parent_id in &touched {
            ops.push(ChangeOp::Touch { id: *parent_id });
        }
        self.store.apply(ops).await?;
        metrics::MESSAGES_DELETED.inc_by(eligible.len() as u64);

        for message in &eligible {
            self.notifier
                .notify(RoomEvent::Removed {
                    room_id: message.room_id,
                    message_id: message.id,
                })
                .await;
        }
        // Each former parent is re-notified exactly once no matter how many
        // of its children were retired.
        for parent_id in &touched {
            threads::refresh_reply_count(self.store.as_ref(), self.notifier.as_ref(), *parent_id)
                .await;
        }

        Ok(RetirementOutcome {
            deleted_count: eligible.len(),
            touched_parents: touched.into_iter().collect(),
        })
    }
}
