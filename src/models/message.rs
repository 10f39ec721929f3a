use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-message todo lifecycle. Stored as a nullable smallint: NULL for
/// plain messages, 0 for unchecked, 1 for checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoState {
    None,
    Unchecked,
    Checked,
}

impl TodoState {
    /// Single-button cycle: none -> unchecked -> checked -> none.
    pub fn toggled(self) -> Self {
        match self {
            TodoState::None => TodoState::Unchecked,
            TodoState::Unchecked => TodoState::Checked,
            TodoState::Checked => TodoState::None,
        }
    }

    pub fn from_db(value: Option<i16>) -> Self {
        match value {
            None => TodoState::None,
            Some(1) => TodoState::Checked,
            Some(_) => TodoState::Unchecked,
        }
    }

    pub fn to_db(self) -> Option<i16> {
        match self {
            TodoState::None => None,
            TodoState::Unchecked => Some(0),
            TodoState::Checked => Some(1),
        }
    }
}

/// A chat message. Threading is capped at two levels: a message is either
/// a root (`parent_id` NULL) or a direct child of a root. `ancestry_root_id`
/// is denormalized for partition scans and always mirrors `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub creator_id: Uuid,
    pub body: String,
    pub parent_id: Option<Uuid>,
    pub ancestry_root_id: Option<Uuid>,
    pub todo_state: TodoState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Root of the thread this message belongs to, itself for a root.
    pub fn thread_root_id(&self) -> Uuid {
        self.ancestry_root_id.unwrap_or(self.id)
    }
}
