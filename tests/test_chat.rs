//! Chat endpoint with a scripted model standing in for the provider.

mod common;

use async_trait::async_trait;
use common::{spawn_server, spawn_with_chat};
use kensenich_manager::app::agent::{ChatMessage, ChatRole};
use kensenich_manager::{standard_tools, ChatAgent, ChatModel};
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Returns canned replies in order and records every request it sees.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    seen: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.seen
            .lock()
            .unwrap()
            .push((system.to_string(), messages.to_vec()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

fn agent(model: Arc<ScriptedModel>, follow_up: bool) -> Arc<ChatAgent> {
    Arc::new(ChatAgent::new(Arc::new(standard_tools()), model).with_follow_up(follow_up))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_runs_tools_and_follows_up() -> anyhow::Result<()> {
    let model = ScriptedModel::new(vec![
        Ok("On it!\n[TOOL_CALL: createTask({\"title\": \"Call Ana\", \"priority\": 1})]"),
        Ok("Created **Call Ana** at priority 1."),
    ]);
    let server = spawn_with_chat(agent(model.clone(), true)).await?;

    let resp = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "Remind me to call Ana, it's urgent"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonValue = resp.json().await?;
    assert_eq!(body["reply"], "Created **Call Ana** at priority 1.");
    assert_eq!(body["tool_calls"].as_array().unwrap().len(), 1);
    assert_eq!(body["tool_calls"][0]["name"], "createTask");
    assert_eq!(body["tool_calls"][0]["args"]["title"], "Call Ana");
    assert_eq!(body["tool_calls"][0]["result"]["success"], true);

    let tasks: Vec<JsonValue> = server.client.get(server.url("/api/tasks")).send().await?.json().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["priority"], 1);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    let (system, first_messages) = &requests[0];
    assert!(system.contains("[TOOL_CALL: createTask("));
    assert!(system.contains("- createTask(title: string"));
    assert_eq!(first_messages.len(), 1);
    assert_eq!(first_messages[0].role, ChatRole::User);

    let (_, second_messages) = &requests[1];
    assert_eq!(second_messages.len(), 3);
    assert_eq!(second_messages[1].role, ChatRole::Assistant);
    assert!(second_messages[2].content.starts_with("Tool results:"));
    assert!(second_messages[2].content.contains("Call Ana"));

    // Both sides of the exchange are persisted, oldest first.
    let history: Vec<JsonValue> = server
        .client
        .get(server.url("/api/chat-messages"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["content"], "Created **Call Ana** at priority 1.");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_falls_back_to_first_reply_when_follow_up_fails() -> anyhow::Result<()> {
    let model = ScriptedModel::new(vec![
        Ok("Noted.\n\n[TOOL_CALL: rememberFact({\"fact\": \"Lives in Lisbon\"})]\n\n[TOOL_CALL: nope()]"),
        Err("provider timed out"),
    ]);
    let server = spawn_with_chat(agent(model, true)).await?;

    let body: JsonValue = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "I live in Lisbon", "history": []}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["reply"], "Noted.");
    assert_eq!(body["tool_calls"][0]["result"]["success"], true);
    assert_eq!(body["tool_calls"][1]["result"]["error"], "tool 'nope' not found");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_without_tool_calls_asks_model_once() -> anyhow::Result<()> {
    let model = ScriptedModel::new(vec![Ok("Morning! What's first today?"), Ok("Second answer")]);
    let server = spawn_with_chat(agent(model.clone(), true)).await?;

    let body: JsonValue = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "Good morning"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["reply"], "Morning! What's first today?");
    assert_eq!(body["tool_calls"], json!([]));
    assert_eq!(model.requests().len(), 1);

    // The next turn replays persisted history when the request carries none.
    let body: JsonValue = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "Plan my day"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["reply"], "Second answer");
    let requests = model.requests();
    let (_, messages) = &requests[1];
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Good morning", "Morning! What's first today?", "Plan my day"]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_without_follow_up_strips_markers() -> anyhow::Result<()> {
    let model = ScriptedModel::new(vec![Ok(
        "[TOOL_CALL: createGoal({\"title\": \"Launch podcast\"})]",
    )]);
    let server = spawn_with_chat(agent(model.clone(), false)).await?;

    let body: JsonValue = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "New goal: launch a podcast"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["reply"], "Done.");
    assert_eq!(body["tool_calls"][0]["result"]["goal"]["title"], "Launch podcast");
    assert_eq!(model.requests().len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_malformed_only_reply_still_completes_turn() -> anyhow::Result<()> {
    let model = ScriptedModel::new(vec![Ok("[TOOL_CALL: x({bad})]"), Ok("   ")]);
    let server = spawn_with_chat(agent(model.clone(), true)).await?;

    for message in ["Do the thing", "And again"] {
        let resp = server
            .client
            .post(server.url("/api/chat"))
            .json(&json!({"message": message}))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: JsonValue = resp.json().await?;
        let reply = body["reply"].as_str().unwrap();
        assert!(!reply.is_empty());
        assert!(!reply.contains("[TOOL_CALL:"));
        assert_eq!(body["tool_calls"], json!([]));
    }
    assert_eq!(model.requests().len(), 2);

    // Every user turn is paired with an assistant reply.
    let history: Vec<JsonValue> = server
        .client
        .get(server.url("/api/chat-messages"))
        .send()
        .await?
        .json()
        .await?;
    let roles: Vec<&str> = history.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_error_statuses() -> anyhow::Result<()> {
    // No provider configured.
    let server = spawn_server().await?;
    let resp = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "hello"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Provider failure on the first call.
    let model = ScriptedModel::new(vec![Err("upstream exploded with secret detail")]);
    let server = spawn_with_chat(agent(model, true)).await?;
    let resp = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "hello"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: JsonValue = resp.json().await?;
    assert_eq!(body["error"], "Model provider request failed");

    let resp = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"message": "   "}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/chat"))
        .json(&json!({"text": "wrong shape"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}
