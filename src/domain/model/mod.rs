//! Typed table descriptors driving the generic CRUD routers.

use crate::error::AppError;
use crate::storage::{Record, Store};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod actions;
pub mod hooks;
pub mod registry;
pub mod tables;
pub mod values;

pub use registry::TableRegistry;
pub use values::ColumnType;

/// Columns every table carries in addition to its declared ones.
pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";
const IMPLICIT_COLUMNS: [&str; 3] = [ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// Raw SQL default expression, e.g. `'pending'` or `0`.
    pub default: Option<&'static str>,
}

impl ColumnSpec {
    pub fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }
}

/// Lifecycle hooks run by the CRUD core before it touches the store.
///
/// Hooks may mutate the assembled field map (normalise, derive, stamp) or
/// reject the request by returning an error.
pub trait TableHooks: Send + Sync {
    fn before_create(&self, _fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        Ok(())
    }

    fn before_update(
        &self,
        _fields: &mut Record,
        _existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        Ok(())
    }

    fn before_delete(&self, _existing: &Record) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct NoHooks;

impl TableHooks for NoHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
        }
    }
}

/// Everything a custom route handler gets from the request.
#[derive(Debug, Default, Clone)]
pub struct CustomRequest {
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: JsonValue,
}

impl CustomRequest {
    pub fn param(&self, name: &str) -> Result<&str, AppError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::Validation(format!("Missing path parameter '{}'", name)))
    }
}

/// Table-specific behaviour that does not fit the five standard operations.
#[async_trait]
pub trait CustomAction: Send + Sync {
    async fn run(
        &self,
        store: &Store,
        table: &TableSchema,
        request: CustomRequest,
    ) -> Result<JsonValue, AppError>;
}

#[derive(Clone)]
pub struct CustomRoute {
    pub method: RouteMethod,
    /// Path relative to the table's base path, e.g. `/:id/complete`.
    pub path: &'static str,
    pub action: Arc<dyn CustomAction>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid identifier '{ident}' in table '{table}'")]
    InvalidIdentifier { table: String, ident: String },

    #[error("table '{table}' lists unknown column '{column}' as {role}")]
    UnknownColumn {
        table: String,
        column: String,
        role: &'static str,
    },

    #[error("table '{table}' declares column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table '{table}' has invalid default ordering '{order}'")]
    InvalidOrdering { table: String, order: String },

    #[error("table '{table}' route path '{path}' must start with '/'")]
    InvalidRoutePath { table: String, path: String },
}

/// Descriptor for one entity table: its columns, the allow-lists the CRUD
/// core enforces, ordering, hooks and extra routes.
pub struct TableSchema {
    table_name: &'static str,
    label: &'static str,
    route_path: &'static str,
    columns: Vec<ColumnSpec>,
    creatable: Vec<&'static str>,
    updatable: Vec<&'static str>,
    filterable: Vec<&'static str>,
    searchable: Vec<&'static str>,
    required: Vec<&'static str>,
    default_order: &'static str,
    allow_delete: bool,
    hooks: Arc<dyn TableHooks>,
    custom_routes: Vec<CustomRoute>,
}

impl TableSchema {
    pub fn new(table_name: &'static str, label: &'static str, route_path: &'static str) -> Self {
        Self {
            table_name,
            label,
            route_path,
            columns: Vec::new(),
            creatable: Vec::new(),
            updatable: Vec::new(),
            filterable: Vec::new(),
            searchable: Vec::new(),
            required: Vec::new(),
            default_order: "created_at DESC",
            allow_delete: true,
            hooks: Arc::new(NoHooks),
            custom_routes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn creatable(mut self, fields: &[&'static str]) -> Self {
        self.creatable = fields.to_vec();
        self
    }

    pub fn updatable(mut self, fields: &[&'static str]) -> Self {
        self.updatable = fields.to_vec();
        self
    }

    /// Overrides the default filter allow-list (id, creatable, updatable, timestamps).
    pub fn filterable(mut self, fields: &[&'static str]) -> Self {
        self.filterable = fields.to_vec();
        self
    }

    pub fn searchable(mut self, fields: &[&'static str]) -> Self {
        self.searchable = fields.to_vec();
        self
    }

    pub fn required(mut self, fields: &[&'static str]) -> Self {
        self.required = fields.to_vec();
        self
    }

    pub fn order_by(mut self, expr: &'static str) -> Self {
        self.default_order = expr;
        self
    }

    pub fn deletable(mut self, allow: bool) -> Self {
        self.allow_delete = allow;
        self
    }

    pub fn hooks<H: TableHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn custom_route<A: CustomAction + 'static>(
        mut self,
        method: RouteMethod,
        path: &'static str,
        action: A,
    ) -> Self {
        self.custom_routes.push(CustomRoute {
            method,
            path,
            action: Arc::new(action),
        });
        self
    }

    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn route_path(&self) -> &'static str {
        self.route_path
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn creatable_fields(&self) -> &[&'static str] {
        &self.creatable
    }

    pub fn updatable_fields(&self) -> &[&'static str] {
        &self.updatable
    }

    pub fn searchable_fields(&self) -> &[&'static str] {
        &self.searchable
    }

    pub fn required_fields(&self) -> &[&'static str] {
        &self.required
    }

    pub fn default_order(&self) -> &'static str {
        self.default_order
    }

    pub fn allows_delete(&self) -> bool {
        self.allow_delete
    }

    pub fn table_hooks(&self) -> &dyn TableHooks {
        self.hooks.as_ref()
    }

    pub fn custom_routes(&self) -> &[CustomRoute] {
        &self.custom_routes
    }

    pub fn filterable_fields(&self) -> Vec<&'static str> {
        if !self.filterable.is_empty() {
            return self.filterable.clone();
        }
        let mut out: Vec<&'static str> = vec![ID_COLUMN];
        for f in self.creatable.iter().chain(self.updatable.iter()) {
            if !out.contains(f) {
                out.push(f);
            }
        }
        out.push(CREATED_AT_COLUMN);
        out.push(UPDATED_AT_COLUMN);
        out
    }

    pub fn is_filterable(&self, field: &str) -> bool {
        self.filterable_fields().iter().any(|f| *f == field)
    }

    /// Type of a declared or implicit column.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        match column {
            ID_COLUMN => Some(ColumnType::Text),
            CREATED_AT_COLUMN | UPDATED_AT_COLUMN => Some(ColumnType::Timestamp),
            _ => self
                .columns
                .iter()
                .find(|c| c.name == column)
                .map(|c| c.col_type),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_type(column).is_some()
    }

    pub fn create_table_sql(&self) -> String {
        let mut cols_sql: Vec<String> = vec![format!("{} TEXT PRIMARY KEY", ID_COLUMN)];
        for c in &self.columns {
            let mut col = format!("{} {}", c.name, c.col_type.sql_type());
            if !c.nullable {
                col.push_str(" NOT NULL");
            }
            if let Some(default) = c.default {
                col.push_str(" DEFAULT ");
                col.push_str(default);
            }
            if c.unique {
                col.push_str(" UNIQUE");
            }
            cols_sql.push(col);
        }
        cols_sql.push(format!("{} TEXT NOT NULL", CREATED_AT_COLUMN));
        cols_sql.push(format!("{} TEXT NOT NULL", UPDATED_AT_COLUMN));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name,
            cols_sql.join(", ")
        )
    }

    /// Decodes JSON columns (stored as text) and bool columns (stored as 0/1)
    /// back into their JSON shapes.
    pub fn decode_record(&self, mut record: Record) -> Record {
        for c in &self.columns {
            let decoded = match (c.col_type, record.get(c.name)) {
                (ColumnType::Json, Some(JsonValue::String(raw))) => {
                    serde_json::from_str::<JsonValue>(raw).ok()
                }
                (ColumnType::Bool, Some(JsonValue::Number(n))) => {
                    n.as_i64().map(|i| JsonValue::from(i != 0))
                }
                _ => None,
            };
            if let Some(value) = decoded {
                record.insert(c.name.to_string(), value);
            }
        }
        record
    }

    /// Checks that every referenced field is a declared column and every
    /// identifier is safe to interpolate.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let table = self.table_name.to_string();
        if !values::validate_ident(self.table_name) {
            return Err(SchemaError::InvalidIdentifier {
                table: table.clone(),
                ident: table,
            });
        }
        if !self.route_path.starts_with('/') {
            return Err(SchemaError::InvalidRoutePath {
                table,
                path: self.route_path.to_string(),
            });
        }

        let mut seen: Vec<&str> = IMPLICIT_COLUMNS.to_vec();
        for c in &self.columns {
            if !values::validate_ident(c.name) {
                return Err(SchemaError::InvalidIdentifier {
                    table,
                    ident: c.name.to_string(),
                });
            }
            if seen.contains(&c.name) {
                return Err(SchemaError::DuplicateColumn {
                    table,
                    column: c.name.to_string(),
                });
            }
            seen.push(c.name);
        }

        let declared = |f: &str| self.columns.iter().any(|c| c.name == f);
        let checks: [(&'static str, &[&'static str]); 4] = [
            ("creatable", self.creatable.as_slice()),
            ("updatable", self.updatable.as_slice()),
            ("searchable", self.searchable.as_slice()),
            ("required", self.required.as_slice()),
        ];
        for (role, fields) in checks {
            if let Some(f) = fields.iter().find(|f| !declared(f)) {
                return Err(SchemaError::UnknownColumn {
                    table,
                    column: f.to_string(),
                    role,
                });
            }
        }
        if let Some(f) = self.filterable.iter().find(|f| !self.has_column(f)) {
            return Err(SchemaError::UnknownColumn {
                table,
                column: f.to_string(),
                role: "filterable",
            });
        }

        self.validate_ordering()
    }

    fn validate_ordering(&self) -> Result<(), SchemaError> {
        let invalid = || SchemaError::InvalidOrdering {
            table: self.table_name.to_string(),
            order: self.default_order.to_string(),
        };
        for term in self.default_order.split(',') {
            let mut parts = term.split_whitespace();
            let column = parts.next().ok_or_else(invalid)?;
            if !self.has_column(column) {
                return Err(invalid());
            }
            match parts.next().map(|d| d.to_ascii_uppercase()) {
                None => {}
                Some(d) if d == "ASC" || d == "DESC" => {}
                Some(_) => return Err(invalid()),
            }
            if parts.next().is_some() {
                return Err(invalid());
            }
        }
        Ok(())
    }

    /// Whether the default ordering already ends on the unique `id` column.
    pub(crate) fn order_is_total(&self) -> bool {
        self.default_order
            .split(',')
            .any(|term| term.split_whitespace().next() == Some(ID_COLUMN))
    }
}
