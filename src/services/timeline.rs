use std::sync::Arc;

use crate::error::AppResult;
use crate::models::Message;
use crate::store::{OrderKey, Partition, ScanRange, TimelineStore};

/// A bounded, contiguous slice of one partition, ascending by
/// `(created_at, id)`. An empty window is a valid answer for an empty
/// partition; a stale cursor fails upstream when the cursor message is
/// looked up, never here.
#[derive(Debug, Clone)]
pub struct Window {
    pub messages: Vec<Message>,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Read-only pagination over a room's root timeline or one thread's
/// children. Windows never mutate anything and are stable under concurrent
/// appends at the tail.
pub struct TimelineService {
    store: Arc<dyn TimelineStore>,
}

impl TimelineService {
    pub fn new(store: Arc<dyn TimelineStore>) -> Self {
        Self { store }
    }

    /// The most recent `size` messages, in ascending order.
    pub async fn last_page(&self, partition: Partition, size: i64) -> AppResult<Window> {
        let messages = self.store.scan(partition, ScanRange::Tail, size).await?;
        Ok(Window { messages })
    }

    /// Up to `size` messages strictly preceding the cursor, contiguous with
    /// it, cursor excluded.
    pub async fn page_before(
        &self,
        partition: Partition,
        cursor: &Message,
        size: i64,
    ) -> AppResult<Window> {
        let messages = self
            .store
            .scan(partition, ScanRange::Before(OrderKey::from(cursor)), size)
            .await?;
        Ok(Window { messages })
    }

    /// Up to `size` messages strictly following the cursor.
    pub async fn page_after(
        &self,
        partition: Partition,
        cursor: &Message,
        size: i64,
    ) -> AppResult<Window> {
        let messages = self
            .store
            .scan(partition, ScanRange::After(OrderKey::from(cursor)), size)
            .await?;
        Ok(Window { messages })
    }

    /// A window of `size` containing the cursor, split as evenly as
    /// possible before and after it. Near either end of the partition the
    /// short side's unused budget widens the other side.
    pub async fn page_around(
        &self,
        partition: Partition,
        cursor: &Message,
        size: i64,
    ) -> AppResult<Window> {
        if size <= 1 {
            return Ok(Window {
                messages: vec![cursor.clone()],
            });
        }

        let key = OrderKey::from(cursor);
        let before_budget = (size - 1) / 2;
        let mut before = self
            .store
            .scan(partition, ScanRange::Before(key), before_budget)
            .await?;

        let after_budget = size - 1 - before.len() as i64;
        let after = self
            .store
            .scan(partition, ScanRange::After(key), after_budget)
            .await?;

        if (after.len() as i64) < after_budget && (before.len() as i64) == before_budget {
            let widened = before_budget + (after_budget - after.len() as i64);
            before = self
                .store
                .scan(partition, ScanRange::Before(key), widened)
                .await?;
        }

        let mut messages = before;
        messages.push(cursor.clone());
        messages.extend(after);
        Ok(Window { messages })
    }
}
