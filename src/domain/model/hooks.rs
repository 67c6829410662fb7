use crate::domain::model::values::{is_blank, next_timestamp, now_timestamp, parse_timestamp};
use crate::domain::model::TableHooks;
use crate::error::AppError;
use crate::storage::Record;
use serde_json::Value as JsonValue;

/// Enumerated status column with an optional "closed" timestamp.
///
/// Entering one of the terminal values stamps `stamp_column`; moving back out
/// of a terminal value clears it.
pub struct StatusLifecycle {
    pub column: &'static str,
    pub allowed: &'static [&'static str],
    pub terminal: &'static [&'static str],
    pub stamp_column: Option<&'static str>,
}

impl StatusLifecycle {
    fn check(&self, fields: &Record) -> Result<Option<String>, AppError> {
        let Some(value) = fields.get(self.column) else {
            return Ok(None);
        };
        let status = value.as_str().unwrap_or_default().trim().to_lowercase();
        if !self.allowed.contains(&status.as_str()) {
            return Err(AppError::Validation(format!(
                "Invalid {} '{}' (expected one of: {})",
                self.column,
                value.as_str().unwrap_or_default(),
                self.allowed.join(", ")
            )));
        }
        Ok(Some(status))
    }

    fn is_terminal(&self, status: &str) -> bool {
        self.terminal.contains(&status)
    }
}

impl TableHooks for StatusLifecycle {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        if let Some(status) = self.check(fields)? {
            if let (true, Some(stamp)) = (self.is_terminal(&status), self.stamp_column) {
                fields.insert(stamp.to_string(), JsonValue::from(now_timestamp()));
            }
            fields.insert(self.column.to_string(), JsonValue::from(status));
        }
        Ok(())
    }

    fn before_update(
        &self,
        fields: &mut Record,
        existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        let Some(status) = self.check(fields)? else {
            return Ok(());
        };
        let was = existing
            .get(self.column)
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        if let Some(stamp) = self.stamp_column {
            match (self.is_terminal(was), self.is_terminal(&status)) {
                (false, true) => {
                    fields.insert(stamp.to_string(), JsonValue::from(now_timestamp()));
                }
                (true, false) => {
                    fields.insert(stamp.to_string(), JsonValue::Null);
                }
                _ => {}
            }
        }
        fields.insert(self.column.to_string(), JsonValue::from(status));
        Ok(())
    }
}

pub const TASK_STATUSES: &[&str] = &["pending", "in_progress", "completed", "cancelled"];

pub struct TaskHooks {
    lifecycle: StatusLifecycle,
}

impl TaskHooks {
    pub fn new() -> Self {
        Self {
            lifecycle: StatusLifecycle {
                column: "status",
                allowed: TASK_STATUSES,
                terminal: &["completed"],
                stamp_column: Some("completed_at"),
            },
        }
    }

    fn check_priority(fields: &Record) -> Result<(), AppError> {
        match fields.get("priority").and_then(JsonValue::as_i64) {
            Some(p) if !(1..=5).contains(&p) => Err(AppError::Validation(format!(
                "Task priority must be between 1 and 5 (got {})",
                p
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for TaskHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl TableHooks for TaskHooks {
    fn before_create(&self, fields: &mut Record, raw: &JsonValue) -> Result<(), AppError> {
        Self::check_priority(fields)?;
        self.lifecycle.before_create(fields, raw)
    }

    fn before_update(
        &self,
        fields: &mut Record,
        existing: &Record,
        raw: &JsonValue,
    ) -> Result<(), AppError> {
        Self::check_priority(fields)?;
        self.lifecycle.before_update(fields, existing, raw)
    }
}

pub struct GoalHooks;

impl GoalHooks {
    fn apply_progress(fields: &mut Record) -> Result<(), AppError> {
        let Some(progress) = fields.get("progress").and_then(JsonValue::as_i64) else {
            return Ok(());
        };
        if !(0..=100).contains(&progress) {
            return Err(AppError::Validation(format!(
                "Goal progress must be between 0 and 100 (got {})",
                progress
            )));
        }
        if progress == 100 && !fields.contains_key("status") {
            fields.insert("status".to_string(), JsonValue::from("completed"));
        }
        Ok(())
    }
}

impl TableHooks for GoalHooks {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        Self::apply_progress(fields)
    }

    fn before_update(
        &self,
        fields: &mut Record,
        _existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        Self::apply_progress(fields)
    }
}

pub struct ContactHooks;

impl ContactHooks {
    fn normalise_email(fields: &mut Record) -> Result<(), AppError> {
        let Some(email) = fields.get("email").and_then(JsonValue::as_str) else {
            return Ok(());
        };
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            fields.insert("email".to_string(), JsonValue::Null);
            return Ok(());
        }
        let valid = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid {
            return Err(AppError::Validation(format!("Invalid email address '{}'", email)));
        }
        fields.insert("email".to_string(), JsonValue::from(email));
        Ok(())
    }
}

impl TableHooks for ContactHooks {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        Self::normalise_email(fields)
    }

    fn before_update(
        &self,
        fields: &mut Record,
        _existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        Self::normalise_email(fields)
    }
}

/// Work sessions: derives `duration_minutes` from the start/end pair.
pub struct SessionHooks;

impl SessionHooks {
    fn derive_duration(fields: &mut Record, existing: Option<&Record>) -> Result<(), AppError> {
        let lookup = |key: &str| -> Option<String> {
            fields
                .get(key)
                .or_else(|| existing.and_then(|e| e.get(key)))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        };
        let (Some(started), Some(ended)) = (lookup("started_at"), lookup("ended_at")) else {
            return Ok(());
        };
        let (Some(started), Some(ended)) = (parse_timestamp(&started), parse_timestamp(&ended))
        else {
            return Ok(());
        };
        if ended < started {
            return Err(AppError::Validation(
                "Session ended_at must not precede started_at".to_string(),
            ));
        }
        if fields.get("duration_minutes").map_or(true, is_blank) {
            let minutes = (ended - started).num_minutes();
            fields.insert("duration_minutes".to_string(), JsonValue::from(minutes));
        }
        Ok(())
    }
}

impl TableHooks for SessionHooks {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        Self::derive_duration(fields, None)
    }

    fn before_update(
        &self,
        fields: &mut Record,
        existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        Self::derive_duration(fields, Some(existing))
    }
}

/// Calendar events: `ends_at` must not precede `starts_at`.
pub struct EventHooks;

impl EventHooks {
    fn check_range(fields: &Record, existing: Option<&Record>) -> Result<(), AppError> {
        let get = |key: &str| {
            fields
                .get(key)
                .or_else(|| existing.and_then(|e| e.get(key)))
                .and_then(JsonValue::as_str)
                .and_then(parse_timestamp)
        };
        if let (Some(starts), Some(ends)) = (get("starts_at"), get("ends_at")) {
            if ends < starts {
                return Err(AppError::Validation(
                    "Event ends_at must not precede starts_at".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl TableHooks for EventHooks {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        Self::check_range(fields, None)
    }

    fn before_update(
        &self,
        fields: &mut Record,
        existing: &Record,
        _raw: &JsonValue,
    ) -> Result<(), AppError> {
        Self::check_range(fields, Some(existing))
    }
}

pub const CHAT_ROLES: &[&str] = &["user", "assistant"];

pub struct ChatMessageHooks;

impl TableHooks for ChatMessageHooks {
    fn before_create(&self, fields: &mut Record, _raw: &JsonValue) -> Result<(), AppError> {
        let role = fields
            .get("role")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        if !CHAT_ROLES.contains(&role) {
            return Err(AppError::Validation(format!(
                "Invalid chat role '{}' (expected one of: {})",
                role,
                CHAT_ROLES.join(", ")
            )));
        }
        Ok(())
    }
}

/// Used by custom actions that bump a row outside the standard update path.
pub fn touch_timestamp(existing: &Record) -> String {
    next_timestamp(existing.get("updated_at").and_then(JsonValue::as_str))
}
