//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    /// Clear the terminal screen.
    Clear,
    Exit,
    /// Drop the short-term window and any unanswered turn.
    Reset,
    /// Send a message that is never written to long-term memory.
    Private(String),
    /// Show what would be recalled for a query.
    Recall(String),
    Stats,
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim().to_string()),
        None => (trimmed.to_lowercase(), String::new()),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/reset" => ChatCommand::Reset,
        "/stats" => ChatCommand::Stats,
        "/private" | "/p" if !arg.is_empty() => ChatCommand::Private(arg),
        "/private" | "/p" => ChatCommand::Unknown("/private requires a message".to_string()),
        "/recall" if !arg.is_empty() => ChatCommand::Recall(arg),
        "/recall" => ChatCommand::Unknown("/recall requires a query".to_string()),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    let rows = [
        ("/help", "Show this help message"),
        ("/clear", "Clear the screen"),
        ("/reset", "Forget the current conversation (long-term memory is kept)"),
        ("/private <msg>", "Send a message that will not be remembered"),
        ("/recall <query>", "Show the memories that would be recalled"),
        ("/stats", "Show how many memories are stored"),
        ("/exit", "End the chat session"),
    ];
    for (cmd, description) in rows {
        println!("  {:<18} {}", style(cmd).cyan(), description);
    }
    println!();
}
