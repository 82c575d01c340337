mod commands;
mod helper;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use uplink_application::{DocumentArchiveService, MissionCatalog};
use uplink_core::backend::Document;
use uplink_core::config::ClientConfig;
use uplink_core::session::{
    ChatSession, Message, PersistenceSink, SendOutcome, SendPolicy, SessionStore,
};
use uplink_infrastructure::{ConfigService, FileSink, MemorySink, UplinkPaths};
use uplink_interaction::BackendClient;

use crate::commands::{COMMANDS, Command};
use crate::helper::CliHelper;

/// How long `quit` waits for replies that are still in flight.
const QUIT_GRACE: Duration = Duration::from_secs(15);

/// Terminal client for the mission archive assistant.
#[derive(Parser, Debug)]
#[command(name = "uplink", version, about, long_about = None)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Directory for persisted sessions (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// How overlapping sends are handled: concurrent or single_flight
    #[arg(long)]
    policy: Option<SendPolicy>,

    /// Path to an alternative config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep sessions in memory only
    #[arg(long)]
    ephemeral: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        if let Some(policy) = self.policy {
            config.chat.send_policy = policy;
        }
    }
}

struct App {
    store: Arc<SessionStore>,
    archive: DocumentArchiveService,
    client: Arc<BackendClient>,
}

/// Installs a daily-rolling file logger so log lines never interleave with
/// the REPL output. Returns `None` when no log directory can be resolved.
fn init_logging() -> Result<Option<WorkerGuard>> {
    let Ok(logs_dir) = UplinkPaths::logs_dir() else {
        return Ok(None);
    };
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "uplink.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let service = match &cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::from_default_location()?,
    };
    let mut config = service.get_config()?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

async fn build_app(cli: &Cli, config: &ClientConfig) -> Result<App> {
    let client = Arc::new(BackendClient::from_config(&config.backend)?);

    let sink: Arc<dyn PersistenceSink> = if cli.ephemeral {
        Arc::new(MemorySink::new())
    } else {
        let dir = UplinkPaths::sessions_dir(config.storage.data_dir.as_ref())?;
        tracing::info!(dir = %dir.display(), "Using session directory");
        Arc::new(FileSink::new(dir))
    };

    let store = Arc::new(
        SessionStore::new(sink, client.clone()).with_policy(config.chat.send_policy),
    );
    store.initialize().await;

    let archive = DocumentArchiveService::new(client.clone());

    Ok(App {
        store,
        archive,
        client,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;

    let config = load_config(&cli)?;
    tracing::info!(
        base_url = %config.backend.base_url,
        policy = %config.chat.send_policy,
        "Starting uplink"
    );
    let app = build_app(&cli, &config).await?;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== ISRO Mission Uplink ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Backend: {}", app.client.base_url()).bright_black()
    );
    println!(
        "{}",
        "Type a question, '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();
    print_session(&app.store.active_session().await);

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let Some(command) = commands::parse(&line) else {
                    continue;
                };
                let _ = rl.add_history_entry(line.as_str());

                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                handle_command(&app, command).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    let pending = app.store.pending_count().await;
    if pending > 0 {
        println!(
            "{}",
            format!("Waiting for {pending} pending repl(ies)...").yellow()
        );
        if tokio::time::timeout(QUIT_GRACE, app.store.wait_until_idle())
            .await
            .is_err()
        {
            let lost = app.store.pending_count().await;
            tracing::warn!(lost, "Exiting with requests in flight");
            eprintln!(
                "{}",
                format!("{lost} repl(ies) did not arrive in time and will not be shown.").red()
            );
        }
    }

    Ok(())
}

async fn handle_command(app: &App, command: Command) {
    match command {
        Command::Send(text) => {
            let session_id = app.store.active_session_id().await;
            send(app, session_id, text);
        }
        Command::New => {
            let id = app.store.create_session().await;
            println!("{}", format!("Created session {id}").bright_green());
            print_session(&app.store.active_session().await);
        }
        Command::Sessions => print_sessions(app).await,
        Command::Select(id) => match app.store.select_session(&id).await {
            Ok(()) => print_session(&app.store.active_session().await),
            Err(e) => eprintln!("{}", e.to_string().red()),
        },
        Command::Delete(id) => match app.store.delete_session(&id).await {
            Ok(()) => {
                println!("{}", format!("Deleted session {id}").yellow());
                let active = app.store.active_session().await;
                println!(
                    "{}",
                    format!("Active session: {} ({})", active.title, active.id).bright_black()
                );
            }
            Err(e) if e.is_invalid_operation() => {
                eprintln!("{}", "At least one session must remain.".red());
            }
            Err(e) => eprintln!("{}", e.to_string().red()),
        },
        Command::History => print_session(&app.store.active_session().await),
        Command::Docs(filter) => {
            app.archive.refresh().await;
            let documents = match filter {
                Some(query) => app.archive.filtered(&query).await,
                None => app.archive.documents().await,
            };
            print_documents(&documents);
        }
        Command::Upload(path) => {
            println!("{}", "Initializing Upload...".yellow());
            let status = app.archive.upload(&path).await;
            if status.is_success() {
                println!("{}", status.to_string().bright_green());
            } else {
                eprintln!("{}", status.to_string().red());
            }
        }
        Command::RemoveDoc(name) => {
            if app.archive.delete(&name).await {
                println!("{}", format!("Deleted {name}").yellow());
            } else {
                eprintln!("{}", format!("Failed to delete {name}").red());
            }
        }
        Command::Missions => {
            for mission in MissionCatalog::all() {
                println!(
                    "{} {} {}",
                    mission.title.bold(),
                    format!("[{}]", mission.status).yellow(),
                    mission.date.bright_black()
                );
                println!("    {}", mission.description);
            }
        }
        Command::Brief(title) => match MissionCatalog::find(&title) {
            Some(mission) => {
                let session_id = app.store.active_session_id().await;
                let query = mission.briefing_query();
                println!("{}", format!("> {query}").green());
                send(app, session_id, query);
            }
            None => eprintln!("{}", format!("Unknown mission: {title}").red()),
        },
        Command::Ping => match app.client.ping().await {
            Ok(banner) => println!("{}", banner.bright_green()),
            Err(e) => eprintln!("{}", format!("Backend unreachable: {e}").red()),
        },
        Command::Help => {
            for (_, usage, description) in COMMANDS {
                println!("  {:<18} {}", usage.bright_cyan(), description);
            }
            println!("  {:<18} {}", "quit".bright_cyan(), "Exit");
        }
        Command::MissingArgument(usage) => {
            eprintln!("{}", format!("Usage: {usage}").yellow());
        }
        Command::Unknown(name) => {
            eprintln!("{}", format!("Unknown command: {name}").bright_black());
        }
        Command::Quit => {}
    }
}

/// Sends in the background so the prompt stays responsive while the
/// backend works.
fn send(app: &App, session_id: String, text: String) {
    let store = Arc::clone(&app.store);
    tokio::spawn(async move {
        match store.send_message(&session_id, &text).await {
            Ok(SendOutcome::Answered(message)) => print_ai_message(&message),
            Ok(SendOutcome::Failed(message)) => {
                println!("{}", message.text.red());
            }
            Ok(SendOutcome::Rejected) => {
                println!(
                    "{}",
                    "A transmission is already in flight for this session.".yellow()
                );
            }
            Ok(SendOutcome::Discarded) => {
                println!(
                    "{}",
                    "Reply discarded: its session was deleted.".bright_black()
                );
            }
            Ok(SendOutcome::Ignored) => {}
            Err(e) => eprintln!("{}", e.to_string().red()),
        }
    });
}

async fn print_sessions(app: &App) {
    let active = app.store.active_session_id().await;
    for session in app.store.sessions().await {
        let marker = if session.id == active { "*" } else { " " };
        let pending = if app.store.is_session_pending(&session.id).await {
            " (awaiting reply)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {} {}{}",
            marker.bright_green(),
            session.id.bright_black(),
            session.title,
            pending
        );
    }
}

fn print_session(session: &ChatSession) {
    println!("{}", format!("--- {} ---", session.title).bright_magenta());
    for message in &session.messages {
        if message.is_user() {
            println!("{}", format!("> {}", message.text).green());
        } else {
            print_ai_message(message);
        }
    }
}

fn print_ai_message(message: &Message) {
    for line in message.text.lines() {
        println!("{}", line.bright_blue());
    }
    if let Some(sources) = message.sources.as_ref().filter(|s| !s.is_empty()) {
        println!(
            "{}",
            format!("Sources: {}", sources.join(", ")).bright_magenta()
        );
    }
}

fn print_documents(documents: &[Document]) {
    if documents.is_empty() {
        println!("{}", "No documents in the archive.".bright_black());
        return;
    }
    for doc in documents {
        let pages = doc
            .pages
            .map(|p| format!("{p} pages"))
            .unwrap_or_else(|| "? pages".to_string());
        println!(
            "{}  {}",
            doc.name.bold(),
            format!("{} | {} | {}", doc.size, doc.date, pages).bright_black()
        );
    }
}
