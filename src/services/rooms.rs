use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MemberRole, Room};

pub struct RoomService {
    pool: PgPool,
}

impl RoomService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a room and enroll the creator as its administrator.
    pub async fn create_room(&self, name: String, creator_id: Uuid) -> AppResult<Room> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("room name cannot be empty".into()));
        }
        if name.len() > 255 {
            return Err(AppError::BadRequest("room name too long (max 255)".into()));
        }

        let id = Uuid::now_v7();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO rooms (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(&name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO room_members (room_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(creator_id)
            .bind(MemberRole::Admin.as_db())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Room {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    /// Add a member with the given role, idempotent on re-join.
    pub async fn add_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO room_members (room_id, user_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (room_id, user_id) DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role.as_db())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
