//! Main chat loop orchestration.
//!
//! Wires an Ollama chat agent into a `MemorySession`, reads user input,
//! streams replies, and reports each finished reply back to the session so
//! the exchange is paired and stored in the background.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use console::style;
use futures_util::StreamExt;
use tracing::warn;

use recall_core::agent::session::MemorySession;
use recall_core::memory::format::MemoryContextFormatter;
use recall_infra::ollama::chat::OllamaChatAgent;
use recall_types::agent::BatchInput;
use recall_types::turn::{MessageContent, Role};

use crate::state::AppState;

use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

fn print_banner(state: &AppState, model: &str) {
    println!();
    println!(
        "  {} {}",
        style("recall").cyan().bold(),
        style("chat with long-term memory").dim()
    );
    println!(
        "  user: {}  model: {}  recall: top {} above {:.2}",
        style(state.user_id()).cyan(),
        style(model).yellow(),
        state.config.memory_top_k,
        state.config.memory_threshold
    );
    println!("  {}", style("Type /help for commands, Ctrl+D to exit.").dim());
    println!();
}

/// Stream one reply to stdout and return its full text.
///
/// Returns `None` if the agent failed; whatever was streamed before the
/// failure is left on screen but not remembered.
async fn stream_reply(
    session: &mut MemorySession<OllamaChatAgent>,
    input: BatchInput,
) -> Option<String> {
    let mut stream = session.chat(input);
    let mut reply = String::new();

    print!("  {} ", style("AI >").cyan().bold());
    let _ = std::io::stdout().flush();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                print!("{chunk}");
                let _ = std::io::stdout().flush();
                reply.push_str(&chunk);
            }
            Err(e) => {
                println!();
                eprintln!("  {} {e}", style("!").red().bold());
                warn!(error = %e, "Chat generation failed");
                return None;
            }
        }
    }
    println!();
    println!();
    Some(reply)
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let agent = Arc::new(
        OllamaChatAgent::new(&state.config.chat).context("Failed to create chat agent")?,
    );
    let mut session = MemorySession::new(
        agent.clone(),
        state.adapter.clone(),
        state.user_id(),
        state.config.chat.system_prompt.clone(),
        state.retrieval_settings(),
    );

    print_banner(state, agent.model());

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        let input = match commands::parse(&text) {
            None => BatchInput::text(text),
            Some(ChatCommand::Private(message)) => BatchInput::text(message).with_skip_memory(true),
            Some(ChatCommand::Help) => {
                commands::print_help();
                continue;
            }
            Some(ChatCommand::Clear) => {
                chat_input.clear();
                continue;
            }
            Some(ChatCommand::Exit) => break,
            Some(ChatCommand::Reset) => {
                agent.clear_history();
                session.clear_pending();
                println!("\n  {} Conversation reset.\n", style("*").cyan().bold());
                continue;
            }
            Some(ChatCommand::Recall(query)) => {
                let settings = state.retrieval_settings();
                let memories = state
                    .adapter
                    .retrieve_relevant(&query, state.user_id(), settings.top_k, settings.threshold)
                    .await;
                let block = MemoryContextFormatter::default().format(&memories);
                if block.is_empty() {
                    println!("\n  {} Nothing relevant recalled.\n", style("i").blue().bold());
                } else {
                    println!();
                    for line in block.lines() {
                        println!("  {}", style(line).dim());
                    }
                    println!();
                }
                continue;
            }
            Some(ChatCommand::Stats) => {
                match state.adapter.stats(state.user_id()).await {
                    Ok(stats) => println!(
                        "\n  {} {} memories stored.\n",
                        style("*").cyan().bold(),
                        style(stats.total_memories).bold()
                    ),
                    Err(e) => println!("\n  {} Failed to read stats: {e}\n", style("!").red().bold()),
                }
                continue;
            }
            Some(ChatCommand::Unknown(name)) => {
                println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(name).dim()
                );
                continue;
            }
        };

        let skip_memory = input.skip_memory();
        match stream_reply(&mut session, input).await {
            Some(reply) => {
                session.observe(Role::Assistant, &MessageContent::from(reply), skip_memory);
            }
            None => session.clear_pending(),
        }
    }

    chat_input.flush();
    println!("\n  {}", style("Saving memories...").dim());
    session.shutdown().await;
    println!("  {}", style("Session ended.").dim());
    Ok(())
}
