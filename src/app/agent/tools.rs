//! The assistant's built-in tools.
//!
//! Write tools go through the CRUD service so allow-listing, hooks, ids and
//! timestamps behave exactly as they do over HTTP.

use crate::app::agent::registry::ToolRegistry;
use crate::app::agent::tool::{ParamType, ToolDescriptor};
use crate::app::crud::{self, ListParams};
use crate::domain::model::tables;
use crate::domain::model::values::now_timestamp;
use crate::storage::Store;
use anyhow::Context;
use serde_json::{json, Value as JsonValue};

pub fn standard_tools() -> ToolRegistry {
    let mut reg = ToolRegistry::new();

    reg.register(
        ToolDescriptor::new("createTask", "Create a new task", create_task)
            .required("title", ParamType::String, "Short task title")
            .optional("description", ParamType::String, "Longer details")
            .optional("priority", ParamType::Integer, "1 (highest) to 5 (lowest), default 3")
            .optional("due_date", ParamType::String, "YYYY-MM-DD")
            .optional("project", ParamType::String, "Project name"),
    );
    reg.register(
        ToolDescriptor::new("listTasks", "List tasks, optionally filtered by status", list_tasks)
            .optional("status", ParamType::String, "pending, in_progress, completed or cancelled")
            .optional("limit", ParamType::Integer, "Maximum number of tasks, default 10"),
    );
    reg.register(
        ToolDescriptor::new("updateTaskStatus", "Change the status of a task", update_task_status)
            .required("id", ParamType::String, "Task id")
            .required("status", ParamType::String, "pending, in_progress, completed or cancelled"),
    );
    reg.register(
        ToolDescriptor::new("completeTask", "Mark a task as completed", complete_task)
            .required("id", ParamType::String, "Task id"),
    );
    reg.register(
        ToolDescriptor::new("logSession", "Log a focused work session", log_session)
            .required("duration_minutes", ParamType::Integer, "Length of the session")
            .optional("task_id", ParamType::String, "Task the session was spent on")
            .optional("focus_area", ParamType::String, "What the session was about")
            .optional("notes", ParamType::String, "Free-form notes"),
    );
    reg.register(
        ToolDescriptor::new("createGoal", "Create a new goal", create_goal)
            .required("title", ParamType::String, "Goal title")
            .optional("description", ParamType::String, "Details")
            .optional("category", ParamType::String, "e.g. business, health, career")
            .optional("target_date", ParamType::String, "YYYY-MM-DD"),
    );
    reg.register(
        ToolDescriptor::new("updateGoalProgress", "Set a goal's progress percentage", update_goal_progress)
            .required("id", ParamType::String, "Goal id")
            .required("progress", ParamType::Integer, "0 to 100"),
    );
    reg.register(
        ToolDescriptor::new("createContact", "Add a contact to the CRM", create_contact)
            .required("name", ParamType::String, "Full name")
            .optional("email", ParamType::String, "Email address")
            .optional("phone", ParamType::String, "Phone number")
            .optional("company", ParamType::String, "Company")
            .optional("notes", ParamType::String, "Notes"),
    );
    reg.register(
        ToolDescriptor::new("scheduleFollowUp", "Schedule a follow-up", schedule_follow_up)
            .required("subject", ParamType::String, "What to follow up on")
            .required("due_date", ParamType::String, "YYYY-MM-DD")
            .optional("contact_id", ParamType::String, "Contact id")
            .optional("notes", ParamType::String, "Notes"),
    );
    reg.register(
        ToolDescriptor::new("createDeal", "Add a deal to the sales pipeline", create_deal)
            .required("title", ParamType::String, "Deal title")
            .optional("value", ParamType::Number, "Deal value")
            .optional("company", ParamType::String, "Company")
            .optional("stage", ParamType::String, "lead, qualified, proposal, negotiation, won or lost")
            .optional("contact_id", ParamType::String, "Contact id"),
    );
    reg.register(
        ToolDescriptor::new("createContentIdea", "Capture a content idea", create_content_idea)
            .required("title", ParamType::String, "Working title")
            .optional("platform", ParamType::String, "e.g. linkedin, blog, youtube")
            .optional("body", ParamType::String, "Draft or outline")
            .optional("scheduled_for", ParamType::String, "RFC3339 timestamp"),
    );
    reg.register(
        ToolDescriptor::new("logJobApplication", "Track a job application", log_job_application)
            .required("company", ParamType::String, "Company")
            .required("position", ParamType::String, "Role applied for")
            .optional("status", ParamType::String, "saved, applied, interviewing, offer, accepted, rejected or withdrawn")
            .optional("job_url", ParamType::String, "Posting URL")
            .optional("notes", ParamType::String, "Notes"),
    );
    reg.register(
        ToolDescriptor::new("createEvent", "Put an event on the calendar", create_event)
            .required("title", ParamType::String, "Event title")
            .required("starts_at", ParamType::String, "RFC3339 timestamp")
            .optional("ends_at", ParamType::String, "RFC3339 timestamp")
            .optional("location", ParamType::String, "Where"),
    );
    reg.register(
        ToolDescriptor::new("rememberFact", "Remember a fact about the user", remember_fact)
            .required("fact", ParamType::String, "The fact, in one sentence")
            .optional("category", ParamType::String, "e.g. preference, personal, business"),
    );

    reg
}

fn arg_str<'a>(args: &'a JsonValue, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .with_context(|| format!("'{}' must be a string", key))
}

async fn create_task(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let task = crud::create(&store, &tables::tasks(), &args).await?;
    Ok(json!({ "success": true, "task": task }))
}

async fn list_tasks(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let limit = args
        .get("limit")
        .and_then(JsonValue::as_u64)
        .unwrap_or(10)
        .clamp(1, 100) as u32;
    let mut params = ListParams {
        limit,
        ..ListParams::default()
    };
    if let Some(status) = args.get("status").and_then(JsonValue::as_str) {
        params = params.with_filter("status", status);
    }
    let tasks = crud::list(&store, &tables::tasks(), &params).await?;
    Ok(json!({ "success": true, "count": tasks.len(), "tasks": tasks }))
}

async fn update_task_status(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let id = arg_str(&args, "id")?;
    let status = arg_str(&args, "status")?;
    let task = crud::update(&store, &tables::tasks(), id, &json!({ "status": status })).await?;
    Ok(json!({ "success": true, "task": task }))
}

async fn complete_task(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let id = arg_str(&args, "id")?;
    let task = crud::update(&store, &tables::tasks(), id, &json!({ "status": "completed" })).await?;
    Ok(json!({ "success": true, "task": task }))
}

async fn log_session(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let mut body = args;
    if let Some(obj) = body.as_object_mut() {
        // Sessions logged after the fact start "now" unless told otherwise.
        obj.entry("started_at")
            .or_insert_with(|| JsonValue::from(now_timestamp()));
    }
    let session = crud::create(&store, &tables::work_sessions(), &body).await?;
    Ok(json!({ "success": true, "session": session }))
}

async fn create_goal(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let goal = crud::create(&store, &tables::goals(), &args).await?;
    Ok(json!({ "success": true, "goal": goal }))
}

async fn update_goal_progress(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let id = arg_str(&args, "id")?;
    let progress = args
        .get("progress")
        .cloned()
        .context("'progress' is required")?;
    let goal = crud::update(&store, &tables::goals(), id, &json!({ "progress": progress })).await?;
    Ok(json!({ "success": true, "goal": goal }))
}

async fn create_contact(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let contact = crud::create(&store, &tables::contacts(), &args).await?;
    Ok(json!({ "success": true, "contact": contact }))
}

async fn schedule_follow_up(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let follow_up = crud::create(&store, &tables::follow_ups(), &args).await?;
    Ok(json!({ "success": true, "follow_up": follow_up }))
}

async fn create_deal(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let deal = crud::create(&store, &tables::deals(), &args).await?;
    Ok(json!({ "success": true, "deal": deal }))
}

async fn create_content_idea(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let item = crud::create(&store, &tables::content_items(), &args).await?;
    Ok(json!({ "success": true, "content": item }))
}

async fn log_job_application(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let application = crud::create(&store, &tables::job_applications(), &args).await?;
    Ok(json!({ "success": true, "application": application }))
}

async fn create_event(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let event = crud::create(&store, &tables::calendar_events(), &args).await?;
    Ok(json!({ "success": true, "event": event }))
}

async fn remember_fact(store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
    let mut body = args;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("source".to_string(), JsonValue::from("assistant"));
    }
    let fact = crud::create(&store, &tables::user_facts(), &body).await?;
    Ok(json!({ "success": true, "fact": fact }))
}
