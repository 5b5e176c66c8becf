//! `parley chat` — Interactive or single-message chat mode.
//!
//! Consumes the turn's event stream directly: tool activity goes to stderr
//! as it happens, the final answer to stdout.

use parley_agent::{TurnRunner, DEFAULT_SYSTEM_PROMPT};
use parley_config::AppConfig;
use parley_core::event::StreamEvent;
use parley_core::history::HistoryStore;
use parley_core::message::{ConversationId, Message};
use parley_history::SqliteStore;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub async fn run(
    config: AppConfig,
    message: Option<String>,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.backend.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set PARLEY_API_KEY, or add it to your config file under");
        eprintln!("  [backend] api_key. Get an OpenRouter key at https://openrouter.ai/keys");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let backend = Arc::new(parley_backend::OpenAiCompatBackend::new(
        "openai_compat",
        &config.backend.base_url,
        config.backend.api_key.clone().unwrap_or_default(),
    ));
    let tools = Arc::new(parley_tools::default_registry(&config.extraction.base_url));
    let history: Arc<dyn HistoryStore> = Arc::new(SqliteStore::new(&config.history.db_path).await?);

    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let mut runner = TurnRunner::new(
        backend,
        &config.backend.model,
        tools,
        history,
        system_prompt,
    )
    .with_max_rounds(config.agent.max_rounds)
    .with_temperature(config.backend.temperature)
    .with_max_tokens(config.backend.max_tokens);
    if let Some(ctx) = &config.agent.project_context {
        runner = runner.with_project_context(ctx);
    }

    let conversation = match conversation {
        Some(id) => ConversationId::from(&id),
        None => ConversationId::new(),
    };

    if let Some(msg) = message {
        // Single message mode
        run_turn(&runner, &conversation, &msg).await;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Parley — extraction service chat");
    println!("  Model:        {}", config.backend.model);
    println!("  Service:      {}", config.extraction.base_url);
    println!("  Conversation: {conversation}");
    println!("  Type 'exit' or press Ctrl-D to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        run_turn(&runner, &conversation, line).await;
    }

    Ok(())
}

async fn run_turn(runner: &TurnRunner, conversation: &ConversationId, input: &str) {
    let mut rx = runner.run_stream(conversation.clone(), vec![Message::user(input)]);

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Status { message } => {
                eprintln!("  [{message}]");
            }
            StreamEvent::ToolCall {
                tool_name,
                arguments,
            } => {
                eprintln!("  -> {tool_name} {arguments}");
            }
            StreamEvent::ToolResult { tool_name, result } => {
                let preview: String = result.chars().take(120).collect();
                eprintln!("  <- {tool_name}: {preview}");
            }
            StreamEvent::Message { content } => {
                println!("{content}");
            }
            StreamEvent::Error { message } => {
                eprintln!("  error: {message}");
            }
            StreamEvent::Done => {}
        }
    }
}
