use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, TodoState};

use super::{ChangeOp, NewMessage, Partition, ScanRange, TimelineStore, TodoFilter};

const COLUMNS: &str =
    "id, room_id, creator_id, body, parent_id, ancestry_root_id, todo_state, created_at, updated_at";

pub struct PostgresTimelineStore {
    pool: PgPool,
}

impl PostgresTimelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        room_id: row.get("room_id"),
        creator_id: row.get("creator_id"),
        body: row.get("body"),
        parent_id: row.get("parent_id"),
        ancestry_root_id: row.get("ancestry_root_id"),
        todo_state: TodoState::from_db(row.get("todo_state")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn partition_clause(partition: Partition) -> (&'static str, Uuid) {
    match partition {
        Partition::RoomRoots(room_id) => ("room_id = $1 AND parent_id IS NULL", room_id),
        Partition::ThreadChildren(root_id) => ("ancestry_root_id = $1", root_id),
    }
}

#[async_trait]
impl TimelineStore for PostgresTimelineStore {
    async fn insert(&self, new: NewMessage) -> AppResult<Message> {
        // v7 ids are time ordered, which keeps the id a usable tie break
        // within identical created_at timestamps.
        let id = Uuid::now_v7();
        let sql = format!(
            "INSERT INTO messages (id, room_id, creator_id, body) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(new.room_id)
            .bind(new.creator_id)
            .bind(&new.body)
            .fetch_one(&self.pool)
            .await?;

        Ok(message_from_row(&row))
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Message>> {
        let sql = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(message_from_row))
    }

    async fn find_in_room(&self, room_id: Uuid, id: Uuid) -> AppResult<Option<Message>> {
        let sql = format!("SELECT {COLUMNS} FROM messages WHERE id = $1 AND room_id = $2");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_from_row))
    }

    async fn children_of(&self, id: Uuid) -> AppResult<Vec<Message>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM messages WHERE parent_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn scan(
        &self,
        partition: Partition,
        range: ScanRange,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let (clause, partition_id) = partition_clause(partition);

        let rows = match range {
            ScanRange::Tail => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM messages WHERE {clause} \
                     ORDER BY created_at DESC, id DESC LIMIT $2"
                );
                sqlx::query(&sql)
                    .bind(partition_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            ScanRange::Before(key) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM messages WHERE {clause} \
                     AND (created_at, id) < ($2, $3) \
                     ORDER BY created_at DESC, id DESC LIMIT $4"
                );
                sqlx::query(&sql)
                    .bind(partition_id)
                    .bind(key.created_at)
                    .bind(key.id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            ScanRange::After(key) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM messages WHERE {clause} \
                     AND (created_at, id) > ($2, $3) \
                     ORDER BY created_at ASC, id ASC LIMIT $4"
                );
                sqlx::query(&sql)
                    .bind(partition_id)
                    .bind(key.created_at)
                    .bind(key.id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut messages: Vec<Message> = rows.iter().map(message_from_row).collect();
        // Tail and Before scan descending to find the window nearest the
        // anchor; flip back to the partition's ascending order.
        if !matches!(range, ScanRange::After(_)) {
            messages.reverse();
        }
        Ok(messages)
    }

    async fn todo_candidates(
        &self,
        partition: Partition,
        filter: TodoFilter,
    ) -> AppResult<Vec<Message>> {
        let (clause, partition_id) = partition_clause(partition);
        let todo_clause = match filter {
            TodoFilter::Completed => "todo_state = 1",
            TodoFilter::NotTodo => "todo_state IS NULL",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM messages WHERE {clause} AND {todo_clause} \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(partition_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn apply(&self, ops: Vec<ChangeOp>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for op in ops {
            match op {
                ChangeOp::SetParent { id, parent_id } => {
                    let done = sqlx::query(
                        "UPDATE messages SET parent_id = $1, ancestry_root_id = $1, \
                         updated_at = NOW() WHERE id = $2",
                    )
                    .bind(parent_id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    if done.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "message {id} changed concurrently"
                        )));
                    }
                }
                ChangeOp::RepointChildren { from, to } => {
                    sqlx::query(
                        "UPDATE messages SET parent_id = $1, ancestry_root_id = $1, \
                         updated_at = NOW() WHERE parent_id = $2",
                    )
                    .bind(to)
                    .bind(from)
                    .execute(&mut *tx)
                    .await?;
                }
                ChangeOp::PromoteChildren { of } => {
                    sqlx::query(
                        "UPDATE messages SET parent_id = NULL, ancestry_root_id = NULL, \
                         updated_at = NOW() WHERE parent_id = $1",
                    )
                    .bind(of)
                    .execute(&mut *tx)
                    .await?;
                }
                ChangeOp::SetRoom { id, room_id } => {
                    let done =
                        sqlx::query("UPDATE messages SET room_id = $1, updated_at = NOW() WHERE id = $2")
                            .bind(room_id)
                            .bind(id)
                            .execute(&mut *tx)
                            .await?;
                    if done.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "message {id} changed concurrently"
                        )));
                    }
                }
                ChangeOp::SetChildrenRoom { of, room_id } => {
                    sqlx::query(
                        "UPDATE messages SET room_id = $1, updated_at = NOW() WHERE parent_id = $2",
                    )
                    .bind(room_id)
                    .bind(of)
                    .execute(&mut *tx)
                    .await?;
                }
                ChangeOp::SetTodoState { id, state } => {
                    let done = sqlx::query(
                        "UPDATE messages SET todo_state = $1, updated_at = NOW() WHERE id = $2",
                    )
                    .bind(state.to_db())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    if done.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "message {id} changed concurrently"
                        )));
                    }
                }
                ChangeOp::SetBody { id, body } => {
                    let done =
                        sqlx::query("UPDATE messages SET body = $1, updated_at = NOW() WHERE id = $2")
                            .bind(&body)
                            .bind(id)
                            .execute(&mut *tx)
                            .await?;
                    if done.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "message {id} changed concurrently"
                        )));
                    }
                }
                ChangeOp::Touch { id } => {
                    sqlx::query("UPDATE messages SET updated_at = NOW() WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                ChangeOp::Delete { id } => {
                    let done = sqlx::query("DELETE FROM messages WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    if done.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "message {id} changed concurrently"
                        )));
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn room_exists(&self, room_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}
