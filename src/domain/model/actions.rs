//! Custom route actions layered onto table routers.

use crate::app::crud;
use crate::domain::model::hooks::touch_timestamp;
use crate::domain::model::values::now_timestamp;
use crate::domain::model::{CustomAction, CustomRequest, TableSchema, ID_COLUMN};
use crate::error::AppError;
use crate::storage::Store;
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

/// Sets a status column to a fixed value through the regular update path,
/// so hooks (e.g. completion stamps) still run.
pub struct MarkStatus {
    pub column: &'static str,
    pub value: &'static str,
}

#[async_trait]
impl CustomAction for MarkStatus {
    async fn run(
        &self,
        store: &Store,
        table: &TableSchema,
        request: CustomRequest,
    ) -> Result<JsonValue, AppError> {
        let id = request.param(ID_COLUMN)?;
        let body = json!({ self.column: self.value });
        let record = crud::update(store, table, id, &body).await?;
        Ok(JsonValue::Object(record))
    }
}

/// Atomically increments a counter column and stamps when it happened.
pub struct IncrementCounter {
    pub counter: &'static str,
    pub stamp_column: &'static str,
}

#[async_trait]
impl CustomAction for IncrementCounter {
    async fn run(
        &self,
        store: &Store,
        table: &TableSchema,
        request: CustomRequest,
    ) -> Result<JsonValue, AppError> {
        let id = request.param(ID_COLUMN)?;
        let existing = crud::get(store, table, id).await?;

        let sql = format!(
            "UPDATE {} SET {} = COALESCE({}, 0) + 1, {} = ?, updated_at = ? WHERE id = ?",
            table.table_name(),
            self.counter,
            self.counter,
            self.stamp_column
        );
        store
            .execute(
                &sql,
                &[
                    JsonValue::from(now_timestamp()),
                    JsonValue::from(touch_timestamp(&existing)),
                    JsonValue::from(id),
                ],
            )
            .await?;

        let record = crud::get(store, table, id).await?;
        Ok(JsonValue::Object(record))
    }
}

/// Sales pipeline order; `lost` is reachable only by an explicit update.
pub const DEAL_FLOW: &[&str] = &["lead", "qualified", "proposal", "negotiation", "won"];
pub const DEAL_STAGES: &[&str] = &["lead", "qualified", "proposal", "negotiation", "won", "lost"];

/// Moves a deal to the next pipeline stage.
pub struct AdvanceDealStage;

#[async_trait]
impl CustomAction for AdvanceDealStage {
    async fn run(
        &self,
        store: &Store,
        table: &TableSchema,
        request: CustomRequest,
    ) -> Result<JsonValue, AppError> {
        let id = request.param(ID_COLUMN)?;
        let existing = crud::get(store, table, id).await?;
        let stage = existing
            .get("stage")
            .and_then(JsonValue::as_str)
            .unwrap_or("lead");

        let pos = DEAL_FLOW.iter().position(|s| *s == stage);
        let next = match pos {
            Some(p) if p + 1 < DEAL_FLOW.len() => DEAL_FLOW[p + 1],
            _ => {
                return Err(AppError::Validation(format!(
                    "Deal is already closed (stage '{}')",
                    stage
                )))
            }
        };

        let record = crud::update(store, table, id, &json!({ "stage": next })).await?;
        Ok(JsonValue::Object(record))
    }
}
