//! Shared harness: an in-process API server over an in-memory store.

#![allow(dead_code)]

use kensenich_manager::transport;
use kensenich_manager::{standard_tools, ChatAgent, Store, TableRegistry};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Store,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server() -> anyhow::Result<TestServer> {
    let store = Store::in_memory().await?;
    let tables = TableRegistry::standard()?;
    spawn_with(store, tables, None).await
}

pub async fn spawn_with_chat(chat: Arc<ChatAgent>) -> anyhow::Result<TestServer> {
    let store = Store::in_memory().await?;
    let tables = TableRegistry::standard()?;
    spawn_with(store, tables, Some(chat)).await
}

pub async fn spawn_with(
    store: Store,
    tables: TableRegistry,
    chat: Option<Arc<ChatAgent>>,
) -> anyhow::Result<TestServer> {
    tables.apply_to(&store).await?;

    let app_state = transport::http::AppState {
        store: store.clone(),
        tables: Arc::new(tables),
        tools: Arc::new(standard_tools()),
        chat,
        chat_history_limit: 20,
    };
    let router = transport::http::create_router(app_state);

    // Bind to an ephemeral port so tests can run in parallel.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        handle,
    })
}
