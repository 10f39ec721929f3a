use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Opts, TextEncoder};

pub static MESSAGES_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "room_chat_messages_created_total",
        "Messages created across all rooms",
    ))
    .expect("failed to create room_chat_messages_created_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register room_chat_messages_created_total");
    counter
});

pub static MESSAGES_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "room_chat_messages_deleted_total",
        "Messages deleted, individually or via bulk retirement",
    ))
    .expect("failed to create room_chat_messages_deleted_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register room_chat_messages_deleted_total");
    counter
});

pub static BROADCAST_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "room_chat_broadcast_failures_total",
        "Room events that could not be published",
    ))
    .expect("failed to create room_chat_broadcast_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register room_chat_broadcast_failures_total");
    counter
});

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(format!("metrics encode: {e}"));
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}
