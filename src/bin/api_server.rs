// src/bin/api_server.rs

use kensenich_manager::infra::llm::OpenAiChatClient;
use kensenich_manager::transport;
use kensenich_manager::{standard_tools, ChatAgent, ChatModel, Config, Store, TableRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kensenich_manager=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = config.bind_address().parse()?;

    // --- Store + schema ---
    let store = Store::connect(&config.database_url).await?;
    let tables = TableRegistry::standard()?;
    tables.apply_to(&store).await?;
    tracing::info!(tables = ?tables.table_names(), "Table registry initialized");

    // --- Agent ---
    let tools = Arc::new(standard_tools());
    tracing::info!(tools = tools.len(), "Tool registry initialized");

    let chat = match &config.llm {
        Some(llm) => {
            let client = OpenAiChatClient::new(llm.clone())?;
            tracing::info!(model = client.model(), url = %llm.api_url, "Chat enabled");
            let model: Arc<dyn ChatModel> = Arc::new(client);
            Some(Arc::new(
                ChatAgent::new(tools.clone(), model).with_follow_up(config.chat_follow_up),
            ))
        }
        None => {
            tracing::warn!("LLM_API_KEY not set; /api/chat will answer 503");
            None
        }
    };

    let app_state = transport::http::AppState {
        store,
        tables: Arc::new(tables),
        tools,
        chat,
        chat_history_limit: config.chat_history_limit,
    };

    // --- API Server ---
    let app = transport::http::create_router(app_state).merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
    );
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "API server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
