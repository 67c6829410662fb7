use crate::transport::http::types::{AppState, TableInfo, ToolInfo, ToolParamInfo};
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/meta/tables",
    responses(
        (status = 200, description = "Registered tables and their allow-lists", body = Vec<TableInfo>)
    )
)]
pub async fn list_tables_handler(State(state): State<AppState>) -> Json<Vec<TableInfo>> {
    Json(state.tables.tables().map(|t| TableInfo::from(t.as_ref())).collect())
}

#[utoipa::path(
    get,
    path = "/api/meta/tools",
    responses(
        (status = 200, description = "Tools available to the assistant, in prompt order", body = Vec<ToolInfo>)
    )
)]
pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .tools
        .tools()
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            signature: t.signature(),
            parameters: t
                .params()
                .iter()
                .map(|p| ToolParamInfo {
                    name: p.name.to_string(),
                    param_type: p.param_type.as_str().to_string(),
                    description: p.description.to_string(),
                    required: p.required,
                })
                .collect(),
        })
        .collect();
    Json(tools)
}
