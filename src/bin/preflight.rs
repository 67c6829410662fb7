use kensenich_manager::app::agent::chat::ChatMessage;
use kensenich_manager::infra::llm::OpenAiChatClient;
use kensenich_manager::{standard_tools, ChatModel, Config, Store, TableRegistry};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--apply-schema] [--ping-llm]\n\
         \n\
         Reads env vars (all optional):\n\
           DATABASE_URL, LLM_API_URL, LLM_API_KEY, LLM_MODEL, LLM_TIMEOUT_SECS\n\
         \n\
           --apply-schema  create any missing tables\n\
           --ping-llm      send a one-line completion to the configured provider\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let apply_schema = args.iter().any(|a| a == "--apply-schema");
    let ping_llm = args.iter().any(|a| a == "--ping-llm");

    let config = Config::from_env()?;

    println!("> Preflight:");
    println!("  DATABASE_URL={}", config.database_url);
    println!("  Bind address: {}", config.bind_address());

    let store = Store::connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot open {}: {}", config.database_url, e))?;
    store.ping().await?;
    println!("  Database reachable.");

    let registry = TableRegistry::standard()?;
    if apply_schema {
        registry.apply_to(&store).await?;
        println!("  Schema applied.");
    }

    let mut missing = Vec::new();
    for table in registry.tables() {
        if store.table_exists(table.table_name()).await? {
            println!("  [ok]      {:<18} {}", table.table_name(), table.route_path());
        } else {
            println!("  [missing] {:<18} {}", table.table_name(), table.route_path());
            missing.push(table.table_name());
        }
    }
    if !missing.is_empty() && !apply_schema {
        eprintln!(
            "  Warning: {} table(s) missing; the server creates them on start, or re-run with --apply-schema.",
            missing.len()
        );
    }

    let tools = standard_tools();
    println!("  Tools ({}):", tools.len());
    for line in tools.render_prompt().lines() {
        println!("    {}", line);
    }

    match &config.llm {
        None => println!("  LLM_API_KEY not set: /api/chat will answer 503."),
        Some(llm) => {
            println!("  Model provider: {} (model {})", llm.api_url, llm.model);
            if ping_llm {
                let client = OpenAiChatClient::new(llm.clone())?;
                let reply = client
                    .complete("Reply with the single word: pong", &[ChatMessage::user("ping")])
                    .await?;
                println!("  Provider replied: {}", reply.trim());
            }
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
