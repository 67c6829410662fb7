use crate::app::agent::{ChatMessage, ChatRole};
use crate::domain::model::{RouteMethod, TableSchema};
use crate::transport::http::handlers::{chat, crud, custom, health, meta};
use crate::transport::http::types::{
    AppState, ChatRequest, ChatResponse, ColumnInfo, DeleteResponse, ErrorBody, HealthResponse,
    TableInfo, ToolCallResult, ToolInfo, ToolParamInfo,
};
use axum::routing::{get, on, post, MethodFilter};
use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        crud::list_handler,
        crud::get_handler,
        crud::create_handler,
        crud::update_handler,
        crud::delete_handler,
        custom::custom_route_handler,
        chat::chat_handler,
        meta::list_tables_handler,
        meta::list_tools_handler
    ),
    components(schemas(
        ErrorBody,
        DeleteResponse,
        HealthResponse,
        ChatRequest,
        ChatResponse,
        ChatMessage,
        ChatRole,
        ToolCallResult,
        TableInfo,
        ColumnInfo,
        ToolInfo,
        ToolParamInfo
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

fn method_filter(method: RouteMethod) -> MethodFilter {
    match method {
        RouteMethod::Get => MethodFilter::GET,
        RouteMethod::Post => MethodFilter::POST,
        RouteMethod::Put => MethodFilter::PUT,
        RouteMethod::Patch => MethodFilter::PATCH,
        RouteMethod::Delete => MethodFilter::DELETE,
    }
}

/// Router for one table, mounted at its `route_path`.
///
/// `/` serves list and create, `/:id` serves get, update and (when the table
/// permits it) delete. Custom routes sit alongside on the same router.
pub fn table_router(table: Arc<TableSchema>) -> Router<AppState> {
    let mut item = get(crud::get_handler).put(crud::update_handler);
    if table.allows_delete() {
        item = item.delete(crud::delete_handler);
    }

    let mut router = Router::new()
        .route("/", get(crud::list_handler).post(crud::create_handler))
        .route("/:id", item);

    for route in table.custom_routes() {
        router = router.route(
            route.path,
            on(method_filter(route.method), custom::custom_route_handler)
                .layer(Extension(route.clone())),
        );
    }

    router.layer(Extension(table))
}

pub fn create_router(app_state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/meta/tables", get(meta::list_tables_handler))
        .route("/api/meta/tools", get(meta::list_tools_handler));

    for table in app_state.tables.tables() {
        tracing::debug!(
            table = table.table_name(),
            path = table.route_path(),
            "Mounting table router"
        );
        router = router.nest(table.route_path(), table_router(table.clone()));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
