use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;
use crate::store::Partition;

use super::require_visible_room;

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

pub async fn create_room(
    state: web::Data<AppState>,
    ident: Identity,
    req: web::Json<CreateRoomRequest>,
) -> Result<HttpResponse, AppError> {
    let room = state
        .rooms()
        .create_room(req.into_inner().name, ident.user_id)
        .await?;

    Ok(HttpResponse::Created().json(room))
}

#[derive(Deserialize)]
pub struct RetireParams {
    /// Restrict the sweep to one thread's children instead of room roots.
    pub thread: Option<Uuid>,
}

async fn retire_scope(
    state: &AppState,
    room_id: Uuid,
    params: &RetireParams,
) -> Result<Partition, AppError> {
    match params.thread {
        Some(root_id) => {
            let root = state
                .store
                .find_in_room(room_id, root_id)
                .await?
                .ok_or(AppError::NotFound)?;
            Ok(Partition::ThreadChildren(root.thread_root_id()))
        }
        None => Ok(Partition::RoomRoots(room_id)),
    }
}

pub async fn delete_completed_todos(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<Uuid>,
    query: web::Query<RetireParams>,
) -> Result<HttpResponse, AppError> {
    let room_id = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let scope = retire_scope(&state, room_id, &query).await?;
    let outcome = state
        .retirement()
        .retire_completed_todos(scope, ident.user_id)
        .await?;

    if outcome.nothing_eligible() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(outcome))
    }
}

pub async fn delete_non_todos(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<Uuid>,
    query: web::Query<RetireParams>,
) -> Result<HttpResponse, AppError> {
    let room_id = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let scope = retire_scope(&state, room_id, &query).await?;
    let outcome = state
        .retirement()
        .retire_non_todos(scope, ident.user_id)
        .await?;

    if outcome.nothing_eligible() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(outcome))
    }
}
