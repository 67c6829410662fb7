use crate::domain::model::{CustomRequest, CustomRoute, TableSchema};
use crate::error::AppError;
use crate::transport::http::handlers::common::optional_json_body;
use crate::transport::http::types::{AppState, ErrorBody};
use axum::body::Bytes;
use axum::extract::{Query, RawPathParams, State};
use axum::{Extension, Json};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Runs a table's custom action. Which action is carried by the route's own
/// `Extension<CustomRoute>`.
#[utoipa::path(
    post,
    path = "/api/{resource}/{id}/{action}",
    params(
        ("resource" = String, Path, description = "Table route, e.g. deals"),
        ("id" = String, Path, description = "Record id"),
        ("action" = String, Path, description = "Action name, e.g. complete, advance, increment-usage")
    ),
    responses(
        (status = 200, description = "Action result", body = Object),
        (status = 400, description = "Action rejected", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn custom_route_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    Extension(route): Extension<CustomRoute>,
    params: Option<RawPathParams>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let request = CustomRequest {
        params: params
            .map(|raw| {
                raw.iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        query,
        body: optional_json_body(&body)?,
    };
    tracing::debug!(
        table = table.table_name(),
        method = route.method.as_str(),
        path = route.path,
        "Running custom action"
    );
    let result = route.action.run(&state.store, &table, request).await?;
    Ok(Json(result))
}
