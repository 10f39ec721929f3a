mod common;

use common::TestApp;
use room_chat_service::error::AppError;
use room_chat_service::notify::{RenderIntent, RoomEvent};
use uuid::Uuid;

#[tokio::test]
async fn create_rejects_an_empty_body() {
    let app = TestApp::new();
    let room = app.seed_room();

    let err = app
        .messages()
        .create(room, Uuid::new_v4(), "   ".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn create_in_an_unknown_room_is_not_found() {
    let app = TestApp::new();

    let err = app
        .messages()
        .create(Uuid::now_v7(), Uuid::new_v4(), "hello".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn create_with_a_vanished_parent_degrades_to_a_root() {
    let app = TestApp::new();
    let room = app.seed_room();
    let user = Uuid::new_v4();

    // The reply target disappeared between page render and post.
    let message = app
        .messages()
        .create(room, user, "orphan reply".into(), Some(Uuid::now_v7()))
        .await
        .unwrap();

    assert_eq!(message.parent_id, None);
    assert_eq!(message.ancestry_root_id, None);
}

#[tokio::test]
async fn create_emits_a_created_event() {
    let app = TestApp::new();
    let room = app.seed_room();
    let user = Uuid::new_v4();

    let message = app.post(room, user, "hello").await;

    let events = app.notifier.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        RoomEvent::Created { room_id, message: m } if *room_id == room && m.id == message.id
    ));
}

#[tokio::test]
async fn replying_refreshes_the_parents_reply_count() {
    let app = TestApp::new();
    let room = app.seed_room();
    let user = Uuid::new_v4();

    let root = app.post(room, user, "root").await;
    app.notifier.take();

    app.reply(room, user, "reply", root.id).await;

    let events = app.notifier.take();
    assert!(events
        .iter()
        .any(|e| matches!(e, RoomEvent::Created { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::Replaced { message, intent: RenderIntent::ReplyCount, .. } if message.id == root.id
    )));
}

#[tokio::test]
async fn body_edits_leave_threading_untouched() {
    let app = TestApp::new();
    let room = app.seed_room();
    let user = Uuid::new_v4();

    let root = app.post(room, user, "root").await;
    let child = app.reply(room, user, "first draft", root.id).await;
    app.notifier.take();

    let updated = app
        .messages()
        .update_body(room, child.id, "second draft".into())
        .await
        .unwrap();

    assert_eq!(updated.body, "second draft");
    assert_eq!(updated.parent_id, Some(root.id));

    let events = app.notifier.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        RoomEvent::Replaced { intent: RenderIntent::Presentation, .. }
    ));
}

#[tokio::test]
async fn editing_a_missing_message_is_not_found() {
    let app = TestApp::new();
    let room = app.seed_room();

    let err = app
        .messages()
        .update_body(room, Uuid::now_v7(), "text".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
