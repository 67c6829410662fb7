//! Situational context for the system prompt.
//!
//! Every source is optional. A query that fails (most often because a table
//! has not been created yet) leaves its section at the default value and the
//! rest of the assembly carries on.

use crate::storage::{Record, Store};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt::Write;
use std::future::Future;

const PENDING_TASK_LIMIT: i64 = 10;
const ACTIVE_GOAL_LIMIT: i64 = 5;
const FOLLOW_UP_LIMIT: i64 = 5;
const FACT_LIMIT: i64 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounters {
    pub tasks_created: i64,
    pub tasks_completed: i64,
    pub sessions_logged: i64,
    pub focus_minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentContext {
    pub today: String,
    pub pending_tasks: Vec<Record>,
    pub active_goals: Vec<Record>,
    pub overdue_follow_ups: Vec<Record>,
    pub user_facts: Vec<Record>,
    pub today_activity: ActivityCounters,
}

/// Runs one optional source, substituting the default on failure.
async fn guarded<T, F>(source: &'static str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(source, error = %e, "Context source unavailable, using default");
            T::default()
        }
    }
}

impl AgentContext {
    pub async fn assemble(store: &Store, today: NaiveDate) -> Self {
        let day = today.format("%Y-%m-%d").to_string();
        let day_prefix = JsonValue::from(format!("{}%", day));

        let pending_tasks = guarded(
            "pending_tasks",
            store.fetch_all(
                "SELECT id, title, priority, due_date, status FROM tasks \
                 WHERE status IN ('pending', 'in_progress') \
                 ORDER BY priority ASC, created_at DESC LIMIT ?",
                &[JsonValue::from(PENDING_TASK_LIMIT)],
            ),
        )
        .await;

        let active_goals = guarded(
            "active_goals",
            store.fetch_all(
                "SELECT id, title, progress, target_date FROM goals \
                 WHERE status = 'active' ORDER BY target_date ASC LIMIT ?",
                &[JsonValue::from(ACTIVE_GOAL_LIMIT)],
            ),
        )
        .await;

        let overdue_follow_ups = guarded(
            "overdue_follow_ups",
            store.fetch_all(
                "SELECT id, subject, due_date FROM follow_ups \
                 WHERE status = 'pending' AND due_date < ? ORDER BY due_date ASC LIMIT ?",
                &[JsonValue::from(day.clone()), JsonValue::from(FOLLOW_UP_LIMIT)],
            ),
        )
        .await;

        let user_facts = guarded(
            "user_facts",
            store.fetch_all(
                "SELECT fact, category FROM user_facts ORDER BY created_at DESC LIMIT ?",
                &[JsonValue::from(FACT_LIMIT)],
            ),
        )
        .await;

        let today_activity = ActivityCounters {
            tasks_created: guarded(
                "tasks_created",
                store.fetch_count(
                    "SELECT COUNT(*) FROM tasks WHERE created_at LIKE ?",
                    std::slice::from_ref(&day_prefix),
                ),
            )
            .await,
            tasks_completed: guarded(
                "tasks_completed",
                store.fetch_count(
                    "SELECT COUNT(*) FROM tasks WHERE status = 'completed' AND completed_at LIKE ?",
                    std::slice::from_ref(&day_prefix),
                ),
            )
            .await,
            sessions_logged: guarded(
                "sessions_logged",
                store.fetch_count(
                    "SELECT COUNT(*) FROM work_sessions WHERE started_at LIKE ?",
                    std::slice::from_ref(&day_prefix),
                ),
            )
            .await,
            focus_minutes: guarded(
                "focus_minutes",
                store.fetch_count(
                    "SELECT COALESCE(SUM(duration_minutes), 0) FROM work_sessions WHERE started_at LIKE ?",
                    std::slice::from_ref(&day_prefix),
                ),
            )
            .await,
        };

        Self {
            today: day,
            pending_tasks,
            active_goals,
            overdue_follow_ups,
            user_facts,
            today_activity,
        }
    }

    /// Plain-text rendering for the system prompt. Empty sections are omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let a = &self.today_activity;
        let _ = writeln!(
            out,
            "Today ({}): {} tasks created, {} completed, {} work sessions, {} focus minutes.",
            self.today, a.tasks_created, a.tasks_completed, a.sessions_logged, a.focus_minutes
        );

        if !self.pending_tasks.is_empty() {
            out.push_str("\nPending tasks:\n");
            for t in &self.pending_tasks {
                let _ = write!(
                    out,
                    "- [{}] {} (priority {}, {})",
                    text(t, "id"),
                    text(t, "title"),
                    text(t, "priority"),
                    text(t, "status")
                );
                if let Some(due) = t.get("due_date").and_then(JsonValue::as_str) {
                    let _ = write!(out, ", due {}", due);
                }
                out.push('\n');
            }
        }

        if !self.active_goals.is_empty() {
            out.push_str("\nActive goals:\n");
            for g in &self.active_goals {
                let _ = writeln!(
                    out,
                    "- [{}] {}: {}%",
                    text(g, "id"),
                    text(g, "title"),
                    text(g, "progress")
                );
            }
        }

        if !self.overdue_follow_ups.is_empty() {
            out.push_str("\nOverdue follow-ups:\n");
            for f in &self.overdue_follow_ups {
                let _ = writeln!(
                    out,
                    "- [{}] {} (due {})",
                    text(f, "id"),
                    text(f, "subject"),
                    text(f, "due_date")
                );
            }
        }

        if !self.user_facts.is_empty() {
            out.push_str("\nWhat you know about the user:\n");
            for f in &self.user_facts {
                let _ = writeln!(out, "- {} ({})", text(f, "fact"), text(f, "category"));
            }
        }

        out.trim_end().to_string()
    }
}

fn text(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}
