//! Memory CLI commands: remember, search, stats.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use recall_types::memory::RetrievedMemory;

use crate::state::AppState;

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

/// Store one exchange directly, bypassing the chat loop.
///
/// # Examples
///
/// ```bash
/// recall remember "我叫小明" "你好小明！"
/// ```
pub async fn remember(state: &AppState, user: &str, assistant: &str, json: bool) -> Result<()> {
    let record = state
        .adapter
        .try_store(user, assistant, state.user_id())
        .await
        .context("Failed to store memory")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let tags: Vec<&str> = record.tags.iter().map(|t| t.as_str()).collect();
    println!();
    println!(
        "  {} Remembered for '{}': {}",
        style("*").cyan().bold(),
        style(state.user_id()).cyan(),
        style(preview(&record.content)).dim()
    );
    if !tags.is_empty() {
        println!("    tags: {}", style(tags.join(", ")).magenta());
    }
    println!();
    Ok(())
}

/// Show memories similar to `query`.
///
/// Without `--all`, only memories scoring strictly above the threshold are
/// listed, exactly the set the chat loop would inject.
pub async fn search(
    state: &AppState,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    all: bool,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(state.config.memory_top_k);
    let threshold = threshold.unwrap_or(state.config.memory_threshold);

    let memories: Vec<RetrievedMemory> = if all {
        state.adapter.retrieve(query, state.user_id(), limit).await
    } else {
        state
            .adapter
            .retrieve_relevant(query, state.user_id(), limit, threshold)
            .await
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&memories)?);
        return Ok(());
    }

    if memories.is_empty() {
        println!();
        println!(
            "  {} No memories for '{}' match \"{}\".",
            style("i").blue().bold(),
            style(state.user_id()).cyan(),
            query
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Score").fg(Color::White),
        Cell::new("Memory").fg(Color::White),
        Cell::new("Injected").fg(Color::White),
    ]);

    for memory in &memories {
        let injected = memory.score > threshold;
        table.add_row(vec![
            Cell::new(format!("{:.3}", memory.score)).fg(Color::Yellow),
            Cell::new(preview(&memory.content)).fg(Color::White),
            if injected {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::DarkGrey)
            },
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Show the number of stored memories.
pub async fn stats(state: &AppState, json: bool) -> Result<()> {
    let stats = state
        .adapter
        .stats(state.user_id())
        .await
        .context("Failed to read memory stats")?;

    if json {
        let out = serde_json::json!({
            "user_id": state.user_id(),
            "total_memories": stats.total_memories,
            "database": state.config.database_path().display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} memor{} stored for '{}'",
        style("*").cyan().bold(),
        style(stats.total_memories).bold(),
        if stats.total_memories == 1 { "y" } else { "ies" },
        style(state.user_id()).cyan()
    );
    println!(
        "    {}",
        style(state.config.database_path().display()).dim()
    );
    println!();
    Ok(())
}
