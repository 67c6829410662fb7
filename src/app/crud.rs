//! Generic list / get / create / update / delete over any registered table.
//!
//! Every operation is a short sequence of store calls (existence check,
//! mutation, read-back). Nothing here retries; store errors surface as
//! `AppError::Store` and are answered by the HTTP error boundary.

use crate::domain::model::values::{
    coerce_for_column, is_blank, next_timestamp, now_timestamp, validate_ident,
};
use crate::domain::model::{TableSchema, CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use crate::error::AppError;
use crate::storage::{Record, Store};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Body key carrying the optional optimistic-concurrency check on update.
pub const EXPECTED_UPDATED_AT: &str = "expected_updated_at";

/// Parsed list request: pagination, free-text search and equality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    /// Sorted by key so the generated SQL is stable.
    pub filters: Vec<(String, String)>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            filters: Vec::new(),
        }
    }
}

impl ListParams {
    /// Splits raw query parameters into the reserved keys and filters.
    pub fn from_query(mut query: HashMap<String, String>) -> Result<Self, AppError> {
        let page = match query.remove("page") {
            Some(raw) => parse_positive(&raw, "page")?,
            None => DEFAULT_PAGE,
        };
        let limit = match query.remove("limit") {
            Some(raw) => parse_positive(&raw, "limit")?.min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };
        let search = query
            .remove("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut filters: Vec<(String, String)> = query.into_iter().collect();
        filters.sort();

        Ok(Self {
            page,
            limit,
            search,
            filters,
        })
    }

    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self.filters.sort();
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn parse_positive(raw: &str, name: &str) -> Result<u32, AppError> {
    match raw.trim().parse::<u32>() {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(AppError::Validation(format!(
            "'{}' must be a positive integer (got '{}')",
            name, raw
        ))),
    }
}

/// Lists one page of records.
///
/// Filter keys must be on the table's filterable allow-list; anything else is
/// rejected before any SQL is built.
pub async fn list(
    store: &Store,
    table: &TableSchema,
    params: &ListParams,
) -> Result<Vec<Record>, AppError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<JsonValue> = Vec::new();

    for (key, raw) in &params.filters {
        if !validate_ident(key) || !table.is_filterable(key) {
            return Err(AppError::Validation(format!(
                "Unknown filter field '{}' for {}",
                key,
                table.table_name()
            )));
        }
        let column_type = table
            .column_type(key)
            .ok_or_else(|| AppError::Validation(format!("Unknown filter field '{}'", key)))?;
        let value = coerce_for_column(column_type, &JsonValue::from(raw.as_str())).map_err(
            |msg| AppError::Validation(format!("Invalid filter value for '{}': {}", key, msg)),
        )?;
        clauses.push(format!("{} = ?", key));
        binds.push(value);
    }

    if let Some(search) = &params.search {
        let fields = table.searchable_fields();
        if !fields.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            let ors: Vec<String> = fields
                .iter()
                .map(|f| format!("LOWER(COALESCE({}, '')) LIKE ? ESCAPE '\\'", f))
                .collect();
            clauses.push(format!("({})", ors.join(" OR ")));
            binds.extend(fields.iter().map(|_| JsonValue::from(pattern.clone())));
        }
    }

    let mut sql = format!("SELECT * FROM {}", table.table_name());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(table.default_order());
    if !table.order_is_total() {
        // Unique tie-breaker keeps pages disjoint when ordering keys collide.
        sql.push_str(", id ASC");
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    binds.push(JsonValue::from(params.limit));
    binds.push(JsonValue::from(params.offset()));

    let rows = store.fetch_all(&sql, &binds).await?;
    Ok(rows.into_iter().map(|r| table.decode_record(r)).collect())
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub async fn get(store: &Store, table: &TableSchema, id: &str) -> Result<Record, AppError> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", table.table_name());
    match store.fetch_one(&sql, &[JsonValue::from(id)]).await? {
        Some(record) => Ok(table.decode_record(record)),
        None => Err(AppError::NotFound(format!("{} not found", table.label()))),
    }
}

/// Creates a record from the allow-listed creatable fields of `body`.
pub async fn create(store: &Store, table: &TableSchema, body: &JsonValue) -> Result<Record, AppError> {
    let mut fields = allow_listed(table, body, table.creatable_fields())?;

    table.table_hooks().before_create(&mut fields, body)?;
    retain_writable(table, &mut fields);

    let missing: Vec<&str> = table
        .required_fields()
        .iter()
        .copied()
        .filter(|f| fields.get(*f).map_or(true, is_blank))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required field(s) for {}: {}",
            table.label(),
            missing.join(", ")
        )));
    }
    if fields.is_empty() {
        return Err(AppError::Validation("No valid fields provided".to_string()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    fields.insert(ID_COLUMN.to_string(), JsonValue::from(id.clone()));
    fields.insert(CREATED_AT_COLUMN.to_string(), JsonValue::from(now.clone()));
    fields.insert(UPDATED_AT_COLUMN.to_string(), JsonValue::from(now));

    let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.table_name(),
        columns.join(", "),
        placeholders
    );
    let binds: Vec<JsonValue> = fields.values().cloned().collect();
    store.execute(&sql, &binds).await?;

    tracing::debug!(table = table.table_name(), %id, "Record created");
    get(store, table, &id).await
}

/// Updates the allow-listed updatable fields of an existing record.
pub async fn update(
    store: &Store,
    table: &TableSchema,
    id: &str,
    body: &JsonValue,
) -> Result<Record, AppError> {
    let existing = get(store, table, id).await?;

    // Optional optimistic concurrency: fail if the record moved on.
    if let Some(expected) = body.get(EXPECTED_UPDATED_AT).and_then(JsonValue::as_str) {
        let current = existing
            .get(UPDATED_AT_COLUMN)
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        if current != expected {
            return Err(AppError::Conflict(format!(
                "{} was modified concurrently (expected updated_at {}, current {})",
                table.label(),
                expected,
                current
            )));
        }
    }

    let mut fields = allow_listed(table, body, table.updatable_fields())?;
    if fields.is_empty() {
        return Err(AppError::Validation("No valid fields to update".to_string()));
    }

    table.table_hooks().before_update(&mut fields, &existing, body)?;
    retain_writable(table, &mut fields);

    let blanked: Vec<&str> = table
        .required_fields()
        .iter()
        .copied()
        .filter(|f| fields.get(*f).is_some_and(is_blank))
        .collect();
    if !blanked.is_empty() {
        return Err(AppError::Validation(format!(
            "Required field(s) for {} cannot be empty: {}",
            table.label(),
            blanked.join(", ")
        )));
    }

    let updated_at = next_timestamp(existing.get(UPDATED_AT_COLUMN).and_then(JsonValue::as_str));
    fields.insert(UPDATED_AT_COLUMN.to_string(), JsonValue::from(updated_at));

    let assignments: Vec<String> = fields.keys().map(|k| format!("{} = ?", k)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?",
        table.table_name(),
        assignments.join(", ")
    );
    let mut binds: Vec<JsonValue> = fields.values().cloned().collect();
    binds.push(JsonValue::from(id));
    store.execute(&sql, &binds).await?;

    get(store, table, id).await
}

/// Deletes a record, returning `{message, id}`.
pub async fn delete(store: &Store, table: &TableSchema, id: &str) -> Result<JsonValue, AppError> {
    if !table.allows_delete() {
        return Err(AppError::NotPermitted(format!(
            "Deleting {} records is not permitted",
            table.table_name()
        )));
    }
    let existing = get(store, table, id).await?;
    table.table_hooks().before_delete(&existing)?;

    let sql = format!("DELETE FROM {} WHERE id = ?", table.table_name());
    store.execute(&sql, &[JsonValue::from(id)]).await?;

    tracing::debug!(table = table.table_name(), %id, "Record deleted");
    Ok(json!({ "message": "Deleted successfully", "id": id }))
}

/// Copies the allow-listed keys of `body`, coercing each value to its column type.
/// Keys outside the allow-list are dropped silently.
fn allow_listed(
    table: &TableSchema,
    body: &JsonValue,
    allowed: &[&'static str],
) -> Result<Record, AppError> {
    let obj = body
        .as_object()
        .ok_or_else(|| AppError::Validation("Request body must be a JSON object".to_string()))?;

    let mut fields = Record::new();
    let mut errors: Vec<String> = Vec::new();
    for field in allowed {
        let Some(value) = obj.get(*field) else {
            continue;
        };
        let Some(column_type) = table.column_type(field) else {
            continue;
        };
        match coerce_for_column(column_type, value) {
            Ok(v) => {
                fields.insert(field.to_string(), v);
            }
            Err(msg) => errors.push(format!("'{}': {}", field, msg)),
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(format!(
            "Invalid field value(s) for {}: {}",
            table.label(),
            errors.join("; ")
        )));
    }
    Ok(fields)
}

/// Hooks may add derived columns; anything that is not a declared column, or
/// that would overwrite an implicit one, is dropped here.
fn retain_writable(table: &TableSchema, fields: &mut Record) {
    fields.retain(|k, _| {
        let keep = k != ID_COLUMN
            && k != CREATED_AT_COLUMN
            && k != UPDATED_AT_COLUMN
            && table.has_column(k);
        if !keep {
            tracing::warn!(table = table.table_name(), field = %k, "Dropping non-writable field");
        }
        keep
    });
}
