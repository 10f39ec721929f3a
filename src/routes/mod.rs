use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub mod messages;
pub mod rooms;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(crate::metrics::metrics_handler))
        .service(
            web::scope("/rooms")
                .route("", web::post().to(rooms::create_room))
                .service(
                    web::scope("/{room_id}")
                        .route("/messages", web::get().to(messages::index))
                        .route("/messages", web::post().to(messages::create))
                        .route("/messages/{message_id}", web::get().to(messages::show))
                        .route("/messages/{message_id}", web::put().to(messages::update))
                        .route("/messages/{message_id}", web::delete().to(messages::destroy))
                        .route(
                            "/messages/{message_id}/todo",
                            web::post().to(messages::toggle_todo),
                        )
                        .route(
                            "/messages/{message_id}/thread",
                            web::post().to(messages::add_to_thread),
                        )
                        .route(
                            "/messages/{message_id}/thread",
                            web::delete().to(messages::remove_from_thread),
                        )
                        .route(
                            "/messages/{message_id}/move",
                            web::post().to(messages::move_to_room),
                        )
                        .route(
                            "/threads/{root_id}/messages",
                            web::get().to(messages::thread_index),
                        )
                        .route(
                            "/completed-todos",
                            web::delete().to(rooms::delete_completed_todos),
                        )
                        .route("/non-todos", web::delete().to(rooms::delete_non_todos)),
                ),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Rooms an actor is not a member of do not exist from their point of
/// view, so a failed membership check reads as not found rather than
/// forbidden.
pub(crate) async fn require_visible_room(
    state: &AppState,
    actor: Uuid,
    room_id: Uuid,
) -> AppResult<()> {
    if state.perms.is_member(actor, room_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}
