use crate::app::agent::chat::recent_history;
use crate::error::AppError;
use crate::transport::http::handlers::common::json_body;
use crate::transport::http::types::{AppState, ChatRequest, ChatResponse, ErrorBody};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply and the tool calls it made", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ErrorBody),
        (status = 502, description = "Model provider failed", body = ErrorBody),
        (status = 503, description = "No model provider configured", body = ErrorBody)
    )
)]
pub async fn chat_handler(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let request = json_body(request, r#"{"message": "...", "history"?: [...]}"#)?;
    let agent = state.chat.as_ref().ok_or_else(|| {
        AppError::Unavailable("Chat is not configured (set LLM_API_KEY)".to_string())
    })?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("'message' must not be empty".to_string()));
    }

    let history = match request.history {
        Some(h) => h,
        None => recent_history(&state.store, state.chat_history_limit).await?,
    };

    let turn = agent.respond(&state.store, history, message).await?;
    Ok(Json(ChatResponse {
        reply: turn.reply,
        tool_calls: turn.tool_calls.into_iter().map(Into::into).collect(),
    }))
}
