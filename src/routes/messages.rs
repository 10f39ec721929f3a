use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Identity;
use crate::services::permissions::AdministerTarget;
use crate::services::Window;
use crate::state::AppState;
use crate::store::Partition;

use super::require_visible_room;

#[derive(Deserialize)]
pub struct CreateMessageRequest {
    pub body: String,
    pub parent_id: Option<Uuid>,
}

pub async fn create(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<Uuid>,
    req: web::Json<CreateMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let room_id = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let req = req.into_inner();
    let message = state
        .messages()
        .create(room_id, ident.user_id, req.body, req.parent_id)
        .await?;

    Ok(HttpResponse::Created().json(message))
}

#[derive(Deserialize)]
pub struct PageParams {
    pub before: Option<Uuid>,
    pub after: Option<Uuid>,
    pub around: Option<Uuid>,
    pub size: Option<i64>,
}

async fn paged_window(
    state: &AppState,
    room_id: Uuid,
    partition: Partition,
    params: &PageParams,
) -> Result<Window, AppError> {
    let size = params
        .size
        .unwrap_or(state.config.page_size)
        .clamp(1, 200);
    let timeline = state.timeline();

    // A cursor that no longer resolves is a stale client, distinct from an
    // empty partition.
    if let Some(id) = params.before {
        let cursor = state
            .store
            .find_in_room(room_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        timeline.page_before(partition, &cursor, size).await
    } else if let Some(id) = params.after {
        let cursor = state
            .store
            .find_in_room(room_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        timeline.page_after(partition, &cursor, size).await
    } else if let Some(id) = params.around {
        let cursor = state
            .store
            .find_in_room(room_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        timeline.page_around(partition, &cursor, size).await
    } else {
        timeline.last_page(partition, size).await
    }
}

/// Paged root timeline of a room.
pub async fn index(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let room_id = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let window = paged_window(&state, room_id, Partition::RoomRoots(room_id), &query).await?;
    if window.is_empty() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(window.messages))
    }
}

/// Paged children of one thread. A child id resolves to its root's thread.
pub async fn thread_index(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let (room_id, root_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let root = state
        .store
        .find_in_room(room_id, root_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let partition = Partition::ThreadChildren(root.thread_root_id());

    let window = paged_window(&state, room_id, partition, &query).await?;
    if window.is_empty() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(window.messages))
    }
}

pub async fn show(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let message = state
        .store
        .find_in_room(room_id, message_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(HttpResponse::Ok().json(message))
}

#[derive(Deserialize)]
pub struct UpdateMessageRequest {
    pub body: String,
}

pub async fn update(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
    req: web::Json<UpdateMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;
    require_can_administer(&state, ident.user_id, room_id, message_id).await?;

    let message = state
        .messages()
        .update_body(room_id, message_id, req.into_inner().body)
        .await?;

    Ok(HttpResponse::Ok().json(message))
}

pub async fn destroy(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;
    require_can_administer(&state, ident.user_id, room_id, message_id).await?;

    state.threads().destroy(room_id, message_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn toggle_todo(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let message = state.messages().toggle_todo(room_id, message_id).await?;

    Ok(HttpResponse::Ok().json(message))
}

#[derive(Deserialize)]
pub struct AttachRequest {
    pub parent_id: Uuid,
}

pub async fn add_to_thread(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
    req: web::Json<AttachRequest>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let message = state
        .threads()
        .attach(room_id, message_id, req.into_inner().parent_id)
        .await?;

    Ok(HttpResponse::Ok().json(message))
}

pub async fn remove_from_thread(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let message = state.threads().detach(room_id, message_id).await?;

    Ok(HttpResponse::Ok().json(message))
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub target_room_id: Uuid,
}

pub async fn move_to_room(
    state: web::Data<AppState>,
    ident: Identity,
    path: web::Path<(Uuid, Uuid)>,
    req: web::Json<MoveRequest>,
) -> Result<HttpResponse, AppError> {
    let (room_id, message_id) = path.into_inner();
    require_visible_room(&state, ident.user_id, room_id).await?;

    let message = state
        .room_mover()
        .move_to_room(room_id, message_id, req.into_inner().target_room_id, ident.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(message))
}

async fn require_can_administer(
    state: &AppState,
    actor: Uuid,
    room_id: Uuid,
    message_id: Uuid,
) -> Result<(), AppError> {
    let message = state
        .store
        .find_in_room(room_id, message_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if state
        .perms
        .can_administer(actor, AdministerTarget::Message(&message))
        .await?
    {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
