/// OpenAPI documentation for the Room Chat Service
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Room Chat Service API",
        version = "1.0.0",
        description = "Room-based chat with two-level message threading, todo tracking, and cursor pagination",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Rooms", description = "Room creation and bulk todo retirement"),
        (name = "Messages", description = "Message CRUD, threading, todo toggling, and room moves"),
        (name = "Timeline", description = "Cursor-paged timeline and thread reads"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Room Chat Service"
    }

    pub fn version() -> &'static str {
        "1.0.0"
    }
}
