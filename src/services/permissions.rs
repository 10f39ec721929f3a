use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{MemberRole, Message};

/// What an administrative action is aimed at. Kept as an explicit
/// two-variant type so callers cannot pass an unchecked id where a loaded
/// message is required.
#[derive(Debug, Clone, Copy)]
pub enum AdministerTarget<'a> {
    Message(&'a Message),
    Room(Uuid),
}

#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Can `actor` take destructive or administrative action on the target?
    async fn can_administer(&self, actor: Uuid, target: AdministerTarget<'_>) -> AppResult<bool>;

    /// Room membership, which doubles as visibility: rooms an actor is not
    /// a member of do not exist from their point of view.
    async fn is_member(&self, actor: Uuid, room_id: Uuid) -> AppResult<bool>;
}

/// Membership-table backed oracle. A message is administrable by its
/// creator or by a room administrator; a room only by an administrator.
pub struct RoomPermissionOracle {
    pool: PgPool,
}

impl RoomPermissionOracle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_in_room(&self, actor: Uuid, room_id: Uuid) -> AppResult<Option<MemberRole>> {
        let row = sqlx::query("SELECT role FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(actor)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| MemberRole::from_db(r.get::<String, _>("role").as_str())))
    }
}

#[async_trait]
impl PermissionOracle for RoomPermissionOracle {
    async fn can_administer(&self, actor: Uuid, target: AdministerTarget<'_>) -> AppResult<bool> {
        match target {
            AdministerTarget::Message(message) => {
                if message.creator_id == actor {
                    return Ok(true);
                }
                Ok(self.role_in_room(actor, message.room_id).await? == Some(MemberRole::Admin))
            }
            AdministerTarget::Room(room_id) => {
                Ok(self.role_in_room(actor, room_id).await? == Some(MemberRole::Admin))
            }
        }
    }

    async fn is_member(&self, actor: Uuid, room_id: Uuid) -> AppResult<bool> {
        Ok(self.role_in_room(actor, room_id).await?.is_some())
    }
}
