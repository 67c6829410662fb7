//! The application's table catalog.

use super::actions::{AdvanceDealStage, IncrementCounter, MarkStatus, DEAL_STAGES};
use super::hooks::{
    ChatMessageHooks, ContactHooks, EventHooks, GoalHooks, SessionHooks, StatusLifecycle,
    TaskHooks,
};
use super::{ColumnSpec, ColumnType, RouteMethod, TableSchema};

pub fn all() -> Vec<TableSchema> {
    vec![
        tasks(),
        work_sessions(),
        goals(),
        contacts(),
        follow_ups(),
        deals(),
        content_items(),
        brand_assets(),
        job_applications(),
        calendar_events(),
        user_facts(),
        chat_messages(),
    ]
}

pub fn tasks() -> TableSchema {
    TableSchema::new("tasks", "Task", "/api/tasks")
        .column(ColumnSpec::new("title", ColumnType::Text).not_null())
        .column(ColumnSpec::new("description", ColumnType::Text))
        .column(
            ColumnSpec::new("status", ColumnType::Text)
                .not_null()
                .default_sql("'pending'"),
        )
        .column(
            ColumnSpec::new("priority", ColumnType::Integer)
                .not_null()
                .default_sql("3"),
        )
        .column(ColumnSpec::new("due_date", ColumnType::Date))
        .column(ColumnSpec::new("project", ColumnType::Text))
        .column(ColumnSpec::new("tags", ColumnType::Json))
        .column(ColumnSpec::new("estimated_minutes", ColumnType::Integer))
        .column(ColumnSpec::new("completed_at", ColumnType::Timestamp))
        .creatable(&[
            "title",
            "description",
            "status",
            "priority",
            "due_date",
            "project",
            "tags",
            "estimated_minutes",
        ])
        .updatable(&[
            "title",
            "description",
            "status",
            "priority",
            "due_date",
            "project",
            "tags",
            "estimated_minutes",
        ])
        .searchable(&["title", "description", "project"])
        .required(&["title"])
        .order_by("priority ASC, created_at DESC")
        .hooks(TaskHooks::new())
        .custom_route(
            RouteMethod::Post,
            "/:id/complete",
            MarkStatus {
                column: "status",
                value: "completed",
            },
        )
}

pub fn work_sessions() -> TableSchema {
    TableSchema::new("work_sessions", "Session", "/api/sessions")
        .column(ColumnSpec::new("task_id", ColumnType::Text))
        .column(ColumnSpec::new("started_at", ColumnType::Timestamp).not_null())
        .column(ColumnSpec::new("ended_at", ColumnType::Timestamp))
        .column(ColumnSpec::new("duration_minutes", ColumnType::Integer))
        .column(ColumnSpec::new("focus_area", ColumnType::Text))
        .column(ColumnSpec::new("notes", ColumnType::Text))
        .creatable(&[
            "task_id",
            "started_at",
            "ended_at",
            "duration_minutes",
            "focus_area",
            "notes",
        ])
        .updatable(&["ended_at", "duration_minutes", "focus_area", "notes"])
        .searchable(&["focus_area", "notes"])
        .required(&["started_at"])
        .order_by("started_at DESC")
        .hooks(SessionHooks)
}

pub fn goals() -> TableSchema {
    TableSchema::new("goals", "Goal", "/api/goals")
        .column(ColumnSpec::new("title", ColumnType::Text).not_null())
        .column(ColumnSpec::new("description", ColumnType::Text))
        .column(ColumnSpec::new("category", ColumnType::Text))
        .column(ColumnSpec::new("target_date", ColumnType::Date))
        .column(
            ColumnSpec::new("progress", ColumnType::Integer)
                .not_null()
                .default_sql("0"),
        )
        .column(
            ColumnSpec::new("status", ColumnType::Text)
                .not_null()
                .default_sql("'active'"),
        )
        .creatable(&[
            "title",
            "description",
            "category",
            "target_date",
            "progress",
            "status",
        ])
        .updatable(&[
            "title",
            "description",
            "category",
            "target_date",
            "progress",
            "status",
        ])
        .searchable(&["title", "description", "category"])
        .required(&["title"])
        .order_by("target_date ASC, created_at DESC")
        .hooks(GoalHooks)
}

pub fn contacts() -> TableSchema {
    TableSchema::new("contacts", "Contact", "/api/contacts")
        .column(ColumnSpec::new("name", ColumnType::Text).not_null())
        .column(ColumnSpec::new("email", ColumnType::Text))
        .column(ColumnSpec::new("phone", ColumnType::Text))
        .column(ColumnSpec::new("company", ColumnType::Text))
        .column(ColumnSpec::new("role", ColumnType::Text))
        .column(ColumnSpec::new("source", ColumnType::Text))
        .column(ColumnSpec::new("tags", ColumnType::Json))
        .column(ColumnSpec::new("notes", ColumnType::Text))
        .column(ColumnSpec::new("last_contacted_at", ColumnType::Timestamp))
        .creatable(&[
            "name",
            "email",
            "phone",
            "company",
            "role",
            "source",
            "tags",
            "notes",
            "last_contacted_at",
        ])
        .updatable(&[
            "name",
            "email",
            "phone",
            "company",
            "role",
            "source",
            "tags",
            "notes",
            "last_contacted_at",
        ])
        .searchable(&["name", "email", "company", "notes"])
        .required(&["name"])
        .order_by("name ASC")
        .hooks(ContactHooks)
}

pub fn follow_ups() -> TableSchema {
    TableSchema::new("follow_ups", "Follow-up", "/api/follow-ups")
        .column(ColumnSpec::new("contact_id", ColumnType::Text))
        .column(ColumnSpec::new("subject", ColumnType::Text).not_null())
        .column(ColumnSpec::new("notes", ColumnType::Text))
        .column(ColumnSpec::new("due_date", ColumnType::Date).not_null())
        .column(
            ColumnSpec::new("status", ColumnType::Text)
                .not_null()
                .default_sql("'pending'"),
        )
        .column(ColumnSpec::new("completed_at", ColumnType::Timestamp))
        .creatable(&["contact_id", "subject", "notes", "due_date", "status"])
        .updatable(&["subject", "notes", "due_date", "status"])
        .searchable(&["subject", "notes"])
        .required(&["subject", "due_date"])
        .order_by("due_date ASC")
        .hooks(StatusLifecycle {
            column: "status",
            allowed: &["pending", "completed", "cancelled"],
            terminal: &["completed"],
            stamp_column: Some("completed_at"),
        })
        .custom_route(
            RouteMethod::Post,
            "/:id/complete",
            MarkStatus {
                column: "status",
                value: "completed",
            },
        )
}

pub fn deals() -> TableSchema {
    TableSchema::new("deals", "Deal", "/api/deals")
        .column(ColumnSpec::new("title", ColumnType::Text).not_null())
        .column(ColumnSpec::new("contact_id", ColumnType::Text))
        .column(ColumnSpec::new("company", ColumnType::Text))
        .column(ColumnSpec::new("value", ColumnType::Real).default_sql("0"))
        .column(ColumnSpec::new("currency", ColumnType::Text).default_sql("'USD'"))
        .column(
            ColumnSpec::new("stage", ColumnType::Text)
                .not_null()
                .default_sql("'lead'"),
        )
        .column(ColumnSpec::new("probability", ColumnType::Integer))
        .column(ColumnSpec::new("expected_close_date", ColumnType::Date))
        .column(ColumnSpec::new("closed_at", ColumnType::Timestamp))
        .column(ColumnSpec::new("notes", ColumnType::Text))
        .creatable(&[
            "title",
            "contact_id",
            "company",
            "value",
            "currency",
            "stage",
            "probability",
            "expected_close_date",
            "notes",
        ])
        .updatable(&[
            "title",
            "contact_id",
            "company",
            "value",
            "currency",
            "stage",
            "probability",
            "expected_close_date",
            "notes",
        ])
        .searchable(&["title", "company", "notes"])
        .required(&["title"])
        .hooks(StatusLifecycle {
            column: "stage",
            allowed: DEAL_STAGES,
            terminal: &["won", "lost"],
            stamp_column: Some("closed_at"),
        })
        .custom_route(RouteMethod::Post, "/:id/advance", AdvanceDealStage)
}

pub fn content_items() -> TableSchema {
    TableSchema::new("content_items", "Content item", "/api/content")
        .column(ColumnSpec::new("title", ColumnType::Text).not_null())
        .column(ColumnSpec::new("platform", ColumnType::Text))
        .column(ColumnSpec::new("content_type", ColumnType::Text))
        .column(
            ColumnSpec::new("status", ColumnType::Text)
                .not_null()
                .default_sql("'idea'"),
        )
        .column(ColumnSpec::new("body", ColumnType::Text))
        .column(ColumnSpec::new("scheduled_for", ColumnType::Timestamp))
        .column(ColumnSpec::new("published_at", ColumnType::Timestamp))
        .column(ColumnSpec::new("tags", ColumnType::Json))
        .creatable(&[
            "title",
            "platform",
            "content_type",
            "status",
            "body",
            "scheduled_for",
            "tags",
        ])
        .updatable(&[
            "title",
            "platform",
            "content_type",
            "status",
            "body",
            "scheduled_for",
            "tags",
        ])
        .searchable(&["title", "body", "platform"])
        .required(&["title"])
        .hooks(StatusLifecycle {
            column: "status",
            allowed: &["idea", "draft", "scheduled", "published", "archived"],
            terminal: &["published"],
            stamp_column: Some("published_at"),
        })
}

pub fn brand_assets() -> TableSchema {
    TableSchema::new("brand_assets", "Brand asset", "/api/brand-assets")
        .column(ColumnSpec::new("name", ColumnType::Text).not_null())
        .column(ColumnSpec::new("asset_type", ColumnType::Text).not_null())
        .column(ColumnSpec::new("url", ColumnType::Text))
        .column(ColumnSpec::new("value", ColumnType::Text))
        .column(ColumnSpec::new("description", ColumnType::Text))
        .column(ColumnSpec::new("tags", ColumnType::Json))
        .column(
            ColumnSpec::new("usage_count", ColumnType::Integer)
                .not_null()
                .default_sql("0"),
        )
        .column(ColumnSpec::new("last_used_at", ColumnType::Timestamp))
        .creatable(&["name", "asset_type", "url", "value", "description", "tags"])
        .updatable(&["name", "asset_type", "url", "value", "description", "tags"])
        .filterable(&["id", "name", "asset_type", "usage_count"])
        .searchable(&["name", "description", "value"])
        .required(&["name", "asset_type"])
        .order_by("name ASC")
        .custom_route(
            RouteMethod::Post,
            "/:id/increment-usage",
            IncrementCounter {
                counter: "usage_count",
                stamp_column: "last_used_at",
            },
        )
}

pub fn job_applications() -> TableSchema {
    TableSchema::new("job_applications", "Job application", "/api/job-applications")
        .column(ColumnSpec::new("company", ColumnType::Text).not_null())
        .column(ColumnSpec::new("position", ColumnType::Text).not_null())
        .column(
            ColumnSpec::new("status", ColumnType::Text)
                .not_null()
                .default_sql("'applied'"),
        )
        .column(ColumnSpec::new("applied_on", ColumnType::Date))
        .column(ColumnSpec::new("job_url", ColumnType::Text))
        .column(ColumnSpec::new("salary_range", ColumnType::Text))
        .column(ColumnSpec::new("contact_name", ColumnType::Text))
        .column(ColumnSpec::new("next_step", ColumnType::Text))
        .column(ColumnSpec::new("next_step_date", ColumnType::Date))
        .column(ColumnSpec::new("notes", ColumnType::Text))
        .creatable(&[
            "company",
            "position",
            "status",
            "applied_on",
            "job_url",
            "salary_range",
            "contact_name",
            "next_step",
            "next_step_date",
            "notes",
        ])
        .updatable(&[
            "company",
            "position",
            "status",
            "applied_on",
            "job_url",
            "salary_range",
            "contact_name",
            "next_step",
            "next_step_date",
            "notes",
        ])
        .searchable(&["company", "position", "notes"])
        .required(&["company", "position"])
        .hooks(StatusLifecycle {
            column: "status",
            allowed: &[
                "saved",
                "applied",
                "interviewing",
                "offer",
                "accepted",
                "rejected",
                "withdrawn",
            ],
            terminal: &[],
            stamp_column: None,
        })
}

pub fn calendar_events() -> TableSchema {
    TableSchema::new("calendar_events", "Event", "/api/calendar-events")
        .column(ColumnSpec::new("title", ColumnType::Text).not_null())
        .column(ColumnSpec::new("description", ColumnType::Text))
        .column(ColumnSpec::new("starts_at", ColumnType::Timestamp).not_null())
        .column(ColumnSpec::new("ends_at", ColumnType::Timestamp))
        .column(ColumnSpec::new("location", ColumnType::Text))
        .column(
            ColumnSpec::new("all_day", ColumnType::Bool)
                .not_null()
                .default_sql("0"),
        )
        .column(ColumnSpec::new("category", ColumnType::Text))
        .creatable(&[
            "title",
            "description",
            "starts_at",
            "ends_at",
            "location",
            "all_day",
            "category",
        ])
        .updatable(&[
            "title",
            "description",
            "starts_at",
            "ends_at",
            "location",
            "all_day",
            "category",
        ])
        .searchable(&["title", "description", "location"])
        .required(&["title", "starts_at"])
        .order_by("starts_at ASC")
        .hooks(EventHooks)
}

pub fn user_facts() -> TableSchema {
    TableSchema::new("user_facts", "Fact", "/api/user-facts")
        .column(ColumnSpec::new("fact", ColumnType::Text).not_null())
        .column(
            ColumnSpec::new("category", ColumnType::Text)
                .not_null()
                .default_sql("'general'"),
        )
        .column(
            ColumnSpec::new("source", ColumnType::Text)
                .not_null()
                .default_sql("'user'"),
        )
        .creatable(&["fact", "category", "source"])
        .updatable(&["fact", "category"])
        .searchable(&["fact", "category"])
        .required(&["fact"])
}

pub fn chat_messages() -> TableSchema {
    TableSchema::new("chat_messages", "Chat message", "/api/chat-messages")
        .column(ColumnSpec::new("role", ColumnType::Text).not_null())
        .column(ColumnSpec::new("content", ColumnType::Text).not_null())
        .creatable(&["role", "content"])
        .searchable(&["content"])
        .required(&["role", "content"])
        .order_by("created_at ASC")
        .hooks(ChatMessageHooks)
}
