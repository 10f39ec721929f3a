#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use room_chat_service::error::{AppError, AppResult};
use room_chat_service::models::{Message, TodoState};
use room_chat_service::notify::{Notifier, RoomEvent};
use room_chat_service::services::permissions::{AdministerTarget, PermissionOracle};
use room_chat_service::services::{
    MessageService, RetirementService, RoomMover, ThreadService, TimelineService,
};
use room_chat_service::store::{
    ChangeOp, NewMessage, Partition, ScanRange, TimelineStore, TodoFilter,
};

/// In-memory stand-in for the Postgres timeline store. Rows live in a Vec
/// behind a mutex; `apply` mutates a scratch copy and commits it wholesale
/// so a failing batch leaves nothing applied, matching the transactional
/// contract.
pub struct MemoryTimelineStore {
    rows: Mutex<Vec<Message>>,
    rooms: Mutex<HashSet<Uuid>>,
    ticks: AtomicI64,
}

impl MemoryTimelineStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            rooms: Mutex::new(HashSet::new()),
            ticks: AtomicI64::new(0),
        }
    }

    pub fn add_room(&self, id: Uuid) {
        self.rooms.lock().unwrap().insert(id);
    }

    pub fn get(&self, id: Uuid) -> Option<Message> {
        self.rows.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }

    pub fn all(&self) -> Vec<Message> {
        self.rows.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn next_created_at(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(1_700_000_000 + tick, 0).unwrap()
    }

    fn in_partition(message: &Message, partition: Partition) -> bool {
        match partition {
            Partition::RoomRoots(room_id) => {
                message.room_id == room_id && message.parent_id.is_none()
            }
            Partition::ThreadChildren(root_id) => message.ancestry_root_id == Some(root_id),
        }
    }

    fn apply_one(rows: &mut Vec<Message>, op: ChangeOp) -> AppResult<()> {
        match op {
            ChangeOp::SetParent { id, parent_id } => {
                let row = rows
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| AppError::Conflict(format!("message {id} changed concurrently")))?;
                row.parent_id = parent_id;
                row.ancestry_root_id = parent_id;
            }
            ChangeOp::RepointChildren { from, to } => {
                for row in rows.iter_mut().filter(|m| m.parent_id == Some(from)) {
                    row.parent_id = Some(to);
                    row.ancestry_root_id = Some(to);
                }
            }
            ChangeOp::PromoteChildren { of } => {
                for row in rows.iter_mut().filter(|m| m.parent_id == Some(of)) {
                    row.parent_id = None;
                    row.ancestry_root_id = None;
                }
            }
            ChangeOp::SetRoom { id, room_id } => {
                let row = rows
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| AppError::Conflict(format!("message {id} changed concurrently")))?;
                row.room_id = room_id;
            }
            ChangeOp::SetChildrenRoom { of, room_id } => {
                for row in rows.iter_mut().filter(|m| m.parent_id == Some(of)) {
                    row.room_id = room_id;
                }
            }
            ChangeOp::SetTodoState { id, state } => {
                let row = rows
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| AppError::Conflict(format!("message {id} changed concurrently")))?;
                row.todo_state = state;
            }
            ChangeOp::SetBody { id, body } => {
                let row = rows
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| AppError::Conflict(format!("message {id} changed concurrently")))?;
                row.body = body;
            }
            ChangeOp::Touch { id } => {
                if let Some(row) = rows.iter_mut().find(|m| m.id == id) {
                    row.updated_at = Utc::now();
                }
            }
            ChangeOp::Delete { id } => {
                let before = rows.len();
                rows.retain(|m| m.id != id);
                if rows.len() == before {
                    return Err(AppError::Conflict(format!(
                        "message {id} changed concurrently"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TimelineStore for MemoryTimelineStore {
    async fn insert(&self, new: NewMessage) -> AppResult<Message> {
        let created_at = self.next_created_at();
        let message = Message {
            id: Uuid::now_v7(),
            room_id: new.room_id,
            creator_id: new.creator_id,
            body: new.body,
            parent_id: None,
            ancestry_root_id: None,
            todo_state: TodoState::None,
            created_at,
            updated_at: created_at,
        };
        self.rows.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.get(id))
    }

    async fn find_in_room(&self, room_id: Uuid, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.get(id).filter(|m| m.room_id == room_id))
    }

    async fn children_of(&self, id: Uuid) -> AppResult<Vec<Message>> {
        let mut children: Vec<Message> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.parent_id == Some(id))
            .cloned()
            .collect();
        children.sort_by_key(|m| (m.created_at, m.id));
        Ok(children)
    }

    async fn scan(
        &self,
        partition: Partition,
        range: ScanRange,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let limit = limit.max(0) as usize;
        let mut items: Vec<Message> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| Self::in_partition(m, partition))
            .cloned()
            .collect();
        items.sort_by_key(|m| (m.created_at, m.id));

        let window = match range {
            ScanRange::Tail => {
                let start = items.len().saturating_sub(limit);
                items.split_off(start)
            }
            ScanRange::Before(key) => {
                let mut prior: Vec<Message> = items
                    .into_iter()
                    .filter(|m| (m.created_at, m.id) < (key.created_at, key.id))
                    .collect();
                let start = prior.len().saturating_sub(limit);
                prior.split_off(start)
            }
            ScanRange::After(key) => items
                .into_iter()
                .filter(|m| (m.created_at, m.id) > (key.created_at, key.id))
                .take(limit)
                .collect(),
        };
        Ok(window)
    }

    async fn todo_candidates(
        &self,
        partition: Partition,
        filter: TodoFilter,
    ) -> AppResult<Vec<Message>> {
        let wanted = match filter {
            TodoFilter::Completed => TodoState::Checked,
            TodoFilter::NotTodo => TodoState::None,
        };
        let mut items: Vec<Message> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| Self::in_partition(m, partition) && m.todo_state == wanted)
            .cloned()
            .collect();
        items.sort_by_key(|m| (m.created_at, m.id));
        Ok(items)
    }

    async fn apply(&self, ops: Vec<ChangeOp>) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let mut scratch = rows.clone();
        for op in ops {
            Self::apply_one(&mut scratch, op)?;
        }
        *rows = scratch;
        Ok(())
    }

    async fn room_exists(&self, room_id: Uuid) -> AppResult<bool> {
        Ok(self.rooms.lock().unwrap().contains(&room_id))
    }
}

/// Configurable permission oracle. Membership is open by default so most
/// tests don't have to enroll anyone; message administration falls back to
/// the creator rule plus explicitly granted room admins.
pub struct StaticPermissions {
    open_membership: AtomicBool,
    members: Mutex<HashSet<(Uuid, Uuid)>>,
    admins: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self {
            open_membership: AtomicBool::new(true),
            members: Mutex::new(HashSet::new()),
            admins: Mutex::new(HashSet::new()),
        }
    }

    pub fn close_membership(&self) {
        self.open_membership.store(false, Ordering::SeqCst);
    }

    pub fn join(&self, actor: Uuid, room_id: Uuid) {
        self.members.lock().unwrap().insert((actor, room_id));
    }

    pub fn make_admin(&self, actor: Uuid, room_id: Uuid) {
        self.admins.lock().unwrap().insert((actor, room_id));
        self.members.lock().unwrap().insert((actor, room_id));
    }
}

#[async_trait]
impl PermissionOracle for StaticPermissions {
    async fn can_administer(&self, actor: Uuid, target: AdministerTarget<'_>) -> AppResult<bool> {
        match target {
            AdministerTarget::Message(message) => Ok(message.creator_id == actor
                || self
                    .admins
                    .lock()
                    .unwrap()
                    .contains(&(actor, message.room_id))),
            AdministerTarget::Room(room_id) => {
                Ok(self.admins.lock().unwrap().contains(&(actor, room_id)))
            }
        }
    }

    async fn is_member(&self, actor: Uuid, room_id: Uuid) -> AppResult<bool> {
        if self.open_membership.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self.members.lock().unwrap().contains(&(actor, room_id)))
    }
}

/// Captures emitted events for assertions.
pub struct RecordingNotifier {
    events: Mutex<Vec<RoomEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn take(&self) -> Vec<RoomEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: RoomEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Bundles the doubles plus service constructors, mirroring `AppState`.
pub struct TestApp {
    pub store: Arc<MemoryTimelineStore>,
    pub perms: Arc<StaticPermissions>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryTimelineStore::new()),
            perms: Arc::new(StaticPermissions::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    pub fn messages(&self) -> MessageService {
        MessageService::new(self.store.clone(), self.notifier.clone())
    }

    pub fn threads(&self) -> ThreadService {
        ThreadService::new(self.store.clone(), self.notifier.clone())
    }

    pub fn timeline(&self) -> TimelineService {
        TimelineService::new(self.store.clone())
    }

    pub fn room_mover(&self) -> RoomMover {
        RoomMover::new(self.store.clone(), self.notifier.clone(), self.perms.clone())
    }

    pub fn retirement(&self) -> RetirementService {
        RetirementService::new(self.store.clone(), self.notifier.clone(), self.perms.clone())
    }

    pub fn seed_room(&self) -> Uuid {
        let id = Uuid::now_v7();
        self.store.add_room(id);
        id
    }

    pub async fn post(&self, room_id: Uuid, creator_id: Uuid, body: &str) -> Message {
        self.messages()
            .create(room_id, creator_id, body.to_string(), None)
            .await
            .expect("failed to post message")
    }

    pub async fn reply(
        &self,
        room_id: Uuid,
        creator_id: Uuid,
        body: &str,
        parent_id: Uuid,
    ) -> Message {
        self.messages()
            .create(room_id, creator_id, body.to_string(), Some(parent_id))
            .await
            .expect("failed to post reply")
    }
}
