//! Generic table handlers. The table a request targets comes from the
//! `Extension<Arc<TableSchema>>` its router was built with.

use crate::app::crud::{self, ListParams};
use crate::domain::model::TableSchema;
use crate::error::AppError;
use crate::storage::Record;
use crate::transport::http::handlers::common::json_body;
use crate::transport::http::types::{AppState, DeleteResponse, ErrorBody};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

const RECORD_BODY: &str = "a JSON object of field values";

#[utoipa::path(
    get,
    path = "/api/{resource}",
    params(
        ("resource" = String, Path, description = "Table route, e.g. tasks"),
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, default 100, max 1000"),
        ("search" = Option<String>, Query, description = "Case-insensitive substring over searchable fields")
    ),
    responses(
        (status = 200, description = "One page of records", body = Vec<Object>),
        (status = 400, description = "Unknown filter field or bad paging", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Record>>, AppError> {
    let params = ListParams::from_query(query)?;
    let records = crud::list(&state.store, &table, &params).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/{resource}/{id}",
    params(
        ("resource" = String, Path, description = "Table route, e.g. tasks"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "The record", body = Object),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    Ok(Json(crud::get(&state.store, &table, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/{resource}",
    params(("resource" = String, Path, description = "Table route, e.g. tasks")),
    request_body = Object,
    responses(
        (status = 201, description = "Created record", body = Object),
        (status = 400, description = "Missing required field or no valid fields", body = ErrorBody),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ErrorBody)
    )
)]
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let body = json_body(body, RECORD_BODY)?;
    let record = crud::create(&state.store, &table, &body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/api/{resource}/{id}",
    params(
        ("resource" = String, Path, description = "Table route, e.g. tasks"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Updated record", body = Object),
        (status = 400, description = "No valid fields to update", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "expected_updated_at did not match", body = ErrorBody),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ErrorBody)
    )
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    Path(id): Path<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<Record>, AppError> {
    let body = json_body(body, RECORD_BODY)?;
    Ok(Json(crud::update(&state.store, &table, &id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/api/{resource}/{id}",
    params(
        ("resource" = String, Path, description = "Table route, e.g. tasks"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 405, description = "Table does not allow deletes", body = ErrorBody)
    )
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<TableSchema>>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, AppError> {
    Ok(Json(crud::delete(&state.store, &table, &id).await?))
}
