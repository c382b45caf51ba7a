//! services/web/src/bin/web.rs

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use web_lib::{
    adapters::{
        db::DbAdapter,
        definitions::FileDefinitionSource,
        mail::{HttpMailAdapter, NullMailAdapter},
        snippets::FileSnippetStore,
    },
    config::Config,
    error::ApiError,
    web::{
        enter_group_submit_handler, enter_group_view_handler, enter_submit_handler,
        enter_view_handler, index_handler, list_handler, manage_submit_handler,
        manage_view_handler, page_submit_handler, page_view_handler, state::AppState, ApiDoc,
    },
};
use survey_core::ports::MailDelivery;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let definitions = Arc::new(FileDefinitionSource::new(config.config_dir.clone()));
    let snippets = Arc::new(FileSnippetStore::new(config.config_dir.clone()));
    let mailer: Arc<dyn MailDelivery> = match &config.mail_gateway_url {
        Some(endpoint) => Arc::new(HttpMailAdapter::new(endpoint.clone())),
        None => Arc::new(NullMailAdapter),
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store: db_adapter.clone(),
        sessions: db_adapter,
        definitions,
        snippets,
        mailer,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/", get(index_handler))
        .route("/list/", get(list_handler))
        .route(
            "/enter/{name}",
            get(enter_view_handler).post(enter_submit_handler),
        )
        .route(
            "/enter/{name}/{group}",
            get(enter_group_view_handler).post(enter_group_submit_handler),
        )
        .route(
            "/page/{token}",
            get(page_view_handler).post(page_submit_handler),
        )
        .route(
            "/manage",
            get(manage_view_handler).post(manage_submit_handler),
        )
        .route(
            "/manage/",
            get(manage_view_handler).post(manage_submit_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
