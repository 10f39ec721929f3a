use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use room_chat_service::notify::RedisNotifier;
use room_chat_service::openapi::ApiDoc;
use room_chat_service::services::RoomPermissionOracle;
use room_chat_service::store::PostgresTimelineStore;
use room_chat_service::{config, db, error, logging, migrations, routes, state::AppState};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Treat migration failures as fatal - the schema must be in sync
    migrations::run_all(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.clone())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let state = AppState {
        db: pool.clone(),
        store: Arc::new(PostgresTimelineStore::new(pool.clone())),
        perms: Arc::new(RoomPermissionOracle::new(pool)),
        notifier: Arc::new(RedisNotifier::new(redis)),
        config: cfg.clone(),
    };

    tracing::info!(host = %cfg.host, port = cfg.port, "starting room-chat-service");

    let bind_addr = (cfg.host.clone(), cfg.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Cors::permissive())
            .configure(routes::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("server: {e}")))
}
