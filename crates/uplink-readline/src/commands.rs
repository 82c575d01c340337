//! REPL command parsing.

use std::path::PathBuf;

/// Slash commands with their usage and a one-line description.
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("/new", "/new", "Start a new analytical thread"),
    ("/sessions", "/sessions", "List sessions"),
    ("/select", "/select <id>", "Switch to another session"),
    ("/delete", "/delete <id>", "Delete a session"),
    ("/history", "/history", "Show the active session"),
    ("/docs", "/docs [filter]", "List archived documents"),
    ("/upload", "/upload <path>", "Upload a PDF to the archive"),
    ("/rmdoc", "/rmdoc <name>", "Delete an archived document"),
    ("/missions", "/missions", "List missions"),
    ("/brief", "/brief <mission>", "Ask for a mission briefing"),
    ("/ping", "/ping", "Check the backend connection"),
    ("/help", "/help", "Show this help"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    Sessions,
    Select(String),
    Delete(String),
    History,
    Docs(Option<String>),
    Upload(PathBuf),
    RemoveDoc(String),
    Missions,
    Brief(String),
    Ping,
    Help,
    Quit,
    /// A known command invoked without its required argument; carries the usage.
    MissingArgument(&'static str),
    Unknown(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "quit" || trimmed == "exit" {
        return Some(Command::Quit);
    }
    if !trimmed.starts_with('/') {
        return Some(Command::Send(trimmed.to_string()));
    }

    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let required = |build: fn(String) -> Command| match arg.clone() {
        Some(value) => build(value),
        None => Command::MissingArgument(usage(name)),
    };

    let command = match name {
        "/new" => Command::New,
        "/sessions" => Command::Sessions,
        "/select" => required(Command::Select),
        "/delete" => required(Command::Delete),
        "/history" => Command::History,
        "/docs" => Command::Docs(arg.clone()),
        "/upload" => required(|p| Command::Upload(PathBuf::from(p))),
        "/rmdoc" => required(Command::RemoveDoc),
        "/missions" => Command::Missions,
        "/brief" => required(Command::Brief),
        "/ping" => Command::Ping,
        "/help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

fn usage(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(cmd, _, _)| *cmd == name)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("")
}
