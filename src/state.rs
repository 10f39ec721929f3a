use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::config::Config;
use crate::notify::Notifier;
use crate::services::{
    MessageService, PermissionOracle, RetirementService, RoomMover, RoomService, ThreadService,
    TimelineService,
};
use crate::store::TimelineStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub store: Arc<dyn TimelineStore>,
    pub perms: Arc<dyn PermissionOracle>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}

impl AppState {
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

    pub fn rooms(&self) -> RoomService {
        RoomService::new(self.db.clone())
    }
}
