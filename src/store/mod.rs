//! Timeline storage boundary.
//!
//! The engine consumes ordered message storage through the `TimelineStore`
//! trait: point lookups, ancestry-partitioned range scans, and atomic
//! multi-row mutation batches. `PostgresTimelineStore` is the production
//! implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Message, TodoState};

pub mod postgres;

pub use postgres::PostgresTimelineStore;

/// A paginated unit: a room's root timeline or one thread's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    RoomRoots(Uuid),
    ThreadChildren(Uuid),
}

/// Position of a message in the timeline total order. `created_at` is the
/// primary key of the order, message id breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl From<&Message> for OrderKey {
    fn from(message: &Message) -> Self {
        Self {
            created_at: message.created_at,
            id: message.id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ScanRange {
    /// The most recent messages of the partition.
    Tail,
    /// Messages strictly preceding the anchor, nearest first served.
    Before(OrderKey),
    /// Messages strictly following the anchor.
    After(OrderKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoFilter {
    /// Messages with a checked todo.
    Completed,
    /// Messages outside the todo flow entirely.
    NotTodo,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: Uuid,
    pub creator_id: Uuid,
    pub body: String,
}

/// One row-level mutation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum ChangeOp {
    /// Repoint a message under a new parent, or clear it back to a root.
    /// The denormalized thread root mirrors the parent: with depth capped
    /// at two, the parent of a child is always the root.
    SetParent { id: Uuid, parent_id: Option<Uuid> },
    /// Move every direct child of `from` under `to`.
    RepointChildren { from: Uuid, to: Uuid },
    /// Clear parent and thread root for every direct child of `of`.
    PromoteChildren { of: Uuid },
    SetRoom { id: Uuid, room_id: Uuid },
    SetChildrenRoom { of: Uuid, room_id: Uuid },
    SetTodoState { id: Uuid, state: TodoState },
    SetBody { id: Uuid, body: String },
    /// Bump `updated_at` so cached presentations recompute.
    Touch { id: Uuid },
    Delete { id: Uuid },
}

#[async_trait]
pub trait TimelineStore: Send + Sync {
    async fn insert(&self, new: NewMessage) -> AppResult<Message>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Message>>;

    async fn find_in_room(&self, room_id: Uuid, id: Uuid) -> AppResult<Option<Message>>;

    async fn children_of(&self, id: Uuid) -> AppResult<Vec<Message>>;

    /// Window scan over one partition, always returned in ascending
    /// `(created_at, id)` order. `Before` and `After` exclude the anchor
    /// and return the messages nearest to it.
    async fn scan(
        &self,
        partition: Partition,
        range: ScanRange,
        limit: i64,
    ) -> AppResult<Vec<Message>>;

    async fn todo_candidates(
        &self,
        partition: Partition,
        filter: TodoFilter,
    ) -> AppResult<Vec<Message>>;

    /// Apply a batch of mutations as a single transaction. If a single-row
    /// target no longer exists the whole batch fails with `Conflict` and
    /// nothing is applied.
    async fn apply(&self, ops: Vec<ChangeOp>) -> AppResult<()>;

    async fn room_exists(&self, room_id: Uuid) -> AppResult<bool>;
}
