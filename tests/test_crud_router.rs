//! CRUD router behaviour over HTTP: lifecycle, paging, allow-lists, filters,
//! search, custom routes and error statuses.

mod common;

use chrono::DateTime;
use common::{spawn_server, spawn_with};
use kensenich_manager::domain::model::tables;
use kensenich_manager::{Store, TableRegistry};
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;

async fn create(
    server: &common::TestServer,
    path: &str,
    body: JsonValue,
) -> anyhow::Result<JsonValue> {
    let resp = server.client.post(server.url(path)).json(&body).send().await?;
    assert_eq!(resp.status(), StatusCode::CREATED, "create {} {}", path, body);
    Ok(resp.json().await?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_lifecycle_end_to_end() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let task = create(&server, "/api/tasks", json!({"title": "Write spec", "priority": 2})).await?;
    let id = task["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(task["title"], "Write spec");
    assert_eq!(task["priority"], 2);
    assert_eq!(task["status"], "pending");
    assert_eq!(task["created_at"], task["updated_at"]);
    assert!(task["completed_at"].is_null());

    let resp = server
        .client
        .put(server.url(&format!("/api/tasks/{}", id)))
        .json(&json!({"status": "completed"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: JsonValue = resp.json().await?;
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["title"], "Write spec");
    assert!(updated["completed_at"].is_string());
    let before = DateTime::parse_from_rfc3339(task["updated_at"].as_str().unwrap())?;
    let after = DateTime::parse_from_rfc3339(updated["updated_at"].as_str().unwrap())?;
    assert!(after > before);
    assert_eq!(updated["created_at"], task["created_at"]);

    let resp = server
        .client
        .delete(server.url(&format!("/api/tasks/{}", id)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: JsonValue = resp.json().await?;
    assert_eq!(deleted, json!({"message": "Deleted successfully", "id": id}));

    let resp = server
        .client
        .get(server.url(&format!("/api/tasks/{}", id)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: JsonValue = resp.json().await?;
    assert_eq!(body["error"], "Task not found");

    // Deleting twice is a 404 as well.
    let resp = server
        .client
        .delete(server.url(&format!("/api/tasks/{}", id)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pagination_covers_every_record_once() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let mut all_ids = HashSet::new();
    for i in 0..7 {
        let task = create(&server, "/api/tasks", json!({"title": format!("Task {}", i)})).await?;
        all_ids.insert(task["id"].as_str().unwrap().to_string());
    }

    let mut seen = HashSet::new();
    let limit = 3;
    for (page, expected) in [(1, 3), (2, 3), (3, 1), (4, 0)] {
        let resp = server
            .client
            .get(server.url(&format!("/api/tasks?page={}&limit={}", page, limit)))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
        let records: Vec<JsonValue> = resp.json().await?;
        assert_eq!(records.len(), expected, "page {}", page);
        for r in records {
            let id = r["id"].as_str().unwrap().to_string();
            assert!(all_ids.contains(&id));
            assert!(seen.insert(id), "record returned on two pages");
        }
    }
    assert_eq!(seen, all_ids);

    // Defaults return everything.
    let records: Vec<JsonValue> = server.client.get(server.url("/api/tasks")).send().await?.json().await?;
    assert_eq!(records.len(), 7);

    for bad in ["page=0", "limit=0", "page=abc", "limit=-5"] {
        let resp = server
            .client
            .get(server.url(&format!("/api/tasks?{}", bad)))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", bad);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_default_ordering_is_applied() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    create(&server, "/api/tasks", json!({"title": "low", "priority": 5})).await?;
    create(&server, "/api/tasks", json!({"title": "high", "priority": 1})).await?;
    create(&server, "/api/tasks", json!({"title": "mid", "priority": 3})).await?;

    let records: Vec<JsonValue> = server.client.get(server.url("/api/tasks")).send().await?.json().await?;
    let titles: Vec<&str> = records.iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["high", "mid", "low"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_ignores_fields_outside_allow_list() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let task = create(
        &server,
        "/api/tasks",
        json!({
            "title": "Allow-listed",
            "id": "forged-id",
            "created_at": "1999-01-01T00:00:00Z",
            "completed_at": "1999-01-01T00:00:00Z",
            "is_admin": true
        }),
    )
    .await?;
    assert_ne!(task["id"], "forged-id");
    assert_ne!(task["created_at"], "1999-01-01T00:00:00Z");
    assert!(task["completed_at"].is_null());
    assert!(task.get("is_admin").is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_validation_errors() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let resp = server
        .client
        .post(server.url("/api/tasks"))
        .json(&json!({"description": "no title"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: JsonValue = resp.json().await?;
    assert!(body["error"].as_str().unwrap().contains("title"));

    let resp = server
        .client
        .post(server.url("/api/tasks"))
        .json(&json!({"title": "x", "priority": 9}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/tasks"))
        .json(&json!({"title": "x", "status": "someday"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/user-facts"))
        .json(&json!({"unrelated": 1}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/tasks"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: JsonValue = resp.json().await?;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_leaves_omitted_fields_and_is_idempotent() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    let task = create(
        &server,
        "/api/tasks",
        json!({"title": "Keep me", "description": "old", "project": "alpha", "tags": ["a", "b"]}),
    )
    .await?;
    let url = server.url(&format!("/api/tasks/{}", task["id"].as_str().unwrap()));

    let first: JsonValue = server
        .client
        .put(&url)
        .json(&json!({"description": "new", "id": "other", "bogus": 1}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(first["description"], "new");
    assert_eq!(first["title"], "Keep me");
    assert_eq!(first["project"], "alpha");
    assert_eq!(first["tags"], json!(["a", "b"]));
    assert_eq!(first["id"], task["id"]);

    let second: JsonValue = server
        .client
        .put(&url)
        .json(&json!({"description": "new", "id": "other", "bogus": 1}))
        .send()
        .await?
        .json()
        .await?;
    let strip = |mut v: JsonValue| {
        v.as_object_mut().unwrap().remove("updated_at");
        v
    };
    assert_eq!(strip(first.clone()), strip(second.clone()));
    assert!(second["updated_at"].as_str().unwrap() > first["updated_at"].as_str().unwrap());

    let resp = server.client.put(&url).json(&json!({"bogus": 1})).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: JsonValue = resp.json().await?;
    assert_eq!(body["error"], "No valid fields to update");

    let resp = server
        .client
        .put(server.url("/api/tasks/does-not-exist"))
        .json(&json!({"title": "x"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_json_columns_read_back_exactly() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    let sent = [
        json!("urgent"),
        json!("42"),
        json!(true),
        json!("[1,2]"),
        json!(7),
        json!({"k": [1, "two", null]}),
        json!(["a", "b"]),
    ];
    for tags in sent {
        let task = create(&server, "/api/tasks", json!({"title": "Tagged", "tags": tags})).await?;
        assert_eq!(task["tags"], tags, "create with tags {}", tags);

        let url = server.url(&format!("/api/tasks/{}", task["id"].as_str().unwrap()));
        let reloaded: JsonValue = server.client.get(&url).send().await?.json().await?;
        assert_eq!(reloaded["tags"], tags);

        let updated: JsonValue = server
            .client
            .put(&url)
            .json(&json!({"tags": tags}))
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(updated["tags"], tags);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_cannot_blank_required_fields() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    let task = create(&server, "/api/tasks", json!({"title": "Stays"})).await?;
    let url = server.url(&format!("/api/tasks/{}", task["id"].as_str().unwrap()));

    for title in [json!(""), json!("   "), JsonValue::Null] {
        let resp = server
            .client
            .put(&url)
            .json(&json!({"title": title, "description": "changed"}))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: JsonValue = resp.json().await?;
        assert!(body["error"].as_str().unwrap().contains("title"));
    }

    let reloaded: JsonValue = server.client.get(&url).send().await?.json().await?;
    assert_eq!(reloaded["title"], "Stays");
    assert!(reloaded["description"].is_null());
    assert_eq!(reloaded["updated_at"], task["updated_at"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_with_stale_expected_updated_at_conflicts() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    let goal = create(&server, "/api/goals", json!({"title": "Run 10k"})).await?;
    let url = server.url(&format!("/api/goals/{}", goal["id"].as_str().unwrap()));
    let stamp = goal["updated_at"].as_str().unwrap().to_string();

    let resp = server
        .client
        .put(&url)
        .json(&json!({"progress": 40, "expected_updated_at": stamp}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Same (now stale) stamp again.
    let resp = server
        .client
        .put(&url)
        .json(&json!({"progress": 60, "expected_updated_at": stamp}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let current: JsonValue = server.client.get(&url).send().await?.json().await?;
    assert_eq!(current["progress"], 40);
    assert_eq!(current["status"], "active");

    let done: JsonValue = server
        .client
        .put(&url)
        .json(&json!({"progress": 100}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(done["status"], "completed");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_filters_are_allow_listed_and_coerced() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    create(&server, "/api/tasks", json!({"title": "a", "priority": 1})).await?;
    create(&server, "/api/tasks", json!({"title": "b", "priority": 1, "status": "in_progress"})).await?;
    create(&server, "/api/tasks", json!({"title": "c", "priority": 4})).await?;

    let records: Vec<JsonValue> = server
        .client
        .get(server.url("/api/tasks?priority=1"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(records.len(), 2);

    let records: Vec<JsonValue> = server
        .client
        .get(server.url("/api/tasks?priority=1&status=in_progress"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "b");

    for bad in ["nonexistent=1", "title%3D%27x%27%20OR%201=1", "completed_at=2025-01-01"] {
        let resp = server
            .client
            .get(server.url(&format!("/api/tasks?{}", bad)))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", bad);
        let body: JsonValue = resp.json().await?;
        assert!(body["error"].as_str().unwrap().contains("Unknown filter field"));
    }

    let resp = server
        .client
        .get(server.url("/api/tasks?priority=high"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_is_case_insensitive_and_combines_with_filters() -> anyhow::Result<()> {
    let server = spawn_server().await?;
    create(&server, "/api/tasks", json!({"title": "Quarterly REPORT", "priority": 2})).await?;
    create(&server, "/api/tasks", json!({"title": "Groceries", "description": "weekly report on food"})).await?;
    create(&server, "/api/tasks", json!({"title": "Gym"})).await?;

    let records: Vec<JsonValue> = server
        .client
        .get(server.url("/api/tasks?search=report"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(records.len(), 2);

    let records: Vec<JsonValue> = server
        .client
        .get(server.url("/api/tasks?search=report&priority=2"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Quarterly REPORT");

    // Wildcards in the search text are literal.
    let records: Vec<JsonValue> = server
        .client
        .get(server.url("/api/tasks?search=%25"))
        .send()
        .await?
        .json()
        .await?;
    assert!(records.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_routes() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let task = create(&server, "/api/tasks", json!({"title": "Finish"})).await?;
    let resp = server
        .client
        .post(server.url(&format!("/api/tasks/{}/complete", task["id"].as_str().unwrap())))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let done: JsonValue = resp.json().await?;
    assert_eq!(done["status"], "completed");
    assert!(done["completed_at"].is_string());

    let deal = create(&server, "/api/deals", json!({"title": "Acme retainer", "value": 5000})).await?;
    assert_eq!(deal["stage"], "lead");
    let advance_url = server.url(&format!("/api/deals/{}/advance", deal["id"].as_str().unwrap()));
    let mut stage = String::new();
    for _ in 0..4 {
        let next: JsonValue = server.client.post(&advance_url).send().await?.json().await?;
        stage = next["stage"].as_str().unwrap().to_string();
    }
    assert_eq!(stage, "won");
    let closed: JsonValue = server
        .client
        .get(server.url(&format!("/api/deals/{}", deal["id"].as_str().unwrap())))
        .send()
        .await?
        .json()
        .await?;
    assert!(closed["closed_at"].is_string());
    let resp = server.client.post(&advance_url).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let asset = create(
        &server,
        "/api/brand-assets",
        json!({"name": "Primary blue", "asset_type": "color", "value": "#0044ff"}),
    )
    .await?;
    assert_eq!(asset["usage_count"], 0);
    let url = server.url(&format!("/api/brand-assets/{}/increment-usage", asset["id"].as_str().unwrap()));
    server.client.post(&url).send().await?;
    let bumped: JsonValue = server.client.post(&url).send().await?.json().await?;
    assert_eq!(bumped["usage_count"], 2);
    assert!(bumped["last_used_at"].is_string());
    assert!(bumped["updated_at"].as_str().unwrap() > asset["updated_at"].as_str().unwrap());

    let resp = server
        .client
        .post(server.url("/api/tasks/missing/complete"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_table_hooks_normalise_and_derive() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let contact = create(&server, "/api/contacts", json!({"name": "Ana", "email": "  Ana@Example.COM "})).await?;
    assert_eq!(contact["email"], "ana@example.com");
    let resp = server
        .client
        .post(server.url("/api/contacts"))
        .json(&json!({"name": "Bob", "email": "not-an-email"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let session = create(
        &server,
        "/api/sessions",
        json!({"started_at": "2025-05-01T09:00:00Z", "ended_at": "2025-05-01T10:30:00Z"}),
    )
    .await?;
    assert_eq!(session["duration_minutes"], 90);

    let resp = server
        .client
        .post(server.url("/api/calendar-events"))
        .json(&json!({"title": "Backwards", "starts_at": "2025-05-01T10:00:00Z", "ends_at": "2025-05-01T09:00:00Z"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let event = create(
        &server,
        "/api/calendar-events",
        json!({"title": "Offsite", "starts_at": "2025-05-01T10:00:00Z", "all_day": true}),
    )
    .await?;
    assert_eq!(event["all_day"], true);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_deletable_table_refuses_delete() -> anyhow::Result<()> {
    let mut registry = TableRegistry::new();
    registry.register(tables::tasks().deletable(false))?;
    let server = spawn_with(Store::in_memory().await?, registry, None).await?;

    let task = create(&server, "/api/tasks", json!({"title": "Permanent"})).await?;
    let url = server.url(&format!("/api/tasks/{}", task["id"].as_str().unwrap()));
    let resp = server.client.delete(&url).send().await?;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = server.client.get(&url).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Only the registered table is mounted.
    let resp = server.client.get(server.url("/api/goals")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_and_meta() -> anyhow::Result<()> {
    let server = spawn_server().await?;

    let health: JsonValue = server.client.get(server.url("/health")).send().await?.json().await?;
    assert_eq!(health["status"], "ok");

    let tables: Vec<JsonValue> = server
        .client
        .get(server.url("/api/meta/tables"))
        .send()
        .await?
        .json()
        .await?;
    let tasks = tables.iter().find(|t| t["table_name"] == "tasks").unwrap();
    assert_eq!(tasks["route_path"], "/api/tasks");
    assert_eq!(tasks["custom_routes"], json!(["POST /:id/complete"]));
    assert!(tasks["filterable"].as_array().unwrap().contains(&json!("priority")));

    let tools: Vec<JsonValue> = server
        .client
        .get(server.url("/api/meta/tools"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(tools[0]["name"], "createTask");
    assert!(tools[0]["signature"].as_str().unwrap().starts_with("createTask(title: string"));
    Ok(())
}
