//! colloquy: interactive conversation sessions on the terminal.
//!
//! Reads lines from stdin, runs each through a session backed by the
//! built-in collaborators, and prints the agent's replies. Slash commands
//! inspect and reset the session; the transcript can be exported as JSON
//! on exit.

mod collaborators;
mod config;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use colloquy_core::{Session, SessionError, Speaker, Turn};

use crate::collaborators::{PlainNormalizer, SmallTalkResponder};

#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about = "Interactive conversation sessions")]
struct Args {
    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Write the transcript to this JSON file on exit.
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Skip the startup banner.
    #[arg(long)]
    no_banner: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("transcript export failed: {0}")]
    Export(#[from] serde_json::Error),
}

/// Shape of the exported transcript file.
#[derive(serde::Serialize)]
struct TranscriptExport {
    session: String,
    agent: String,
    turns: Vec<Turn>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("colloquy: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(format!(
            "colloquy_core={level},colloquy_cli={level}"
        )),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "colloquy_core=info,colloquy_cli=info".into()),
    };
    // Logs go to stderr so the conversation on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), CliError> {
    let config = config::load_or_default(args.config.as_deref());

    let session = Session::new(Arc::new(PlainNormalizer), Arc::new(SmallTalkResponder))
        .with_config(config.session_config());
    // Render with the session's own settings, not the raw file values.
    let agent = session.config().agent_name.clone();

    if !args.no_banner {
        println!(
            "colloquy {} (session {})",
            env!("CARGO_PKG_VERSION"),
            session.id()
        );
        println!("Type /help for commands, /quit to leave.");
    }

    session.start()?;
    print_last_agent_turn(&session, &agent);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.trim() {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/reset" => {
                session.start()?;
                print_last_agent_turn(&session, &agent);
            }
            "/transcript" => print_transcript(&session, &agent),
            "/state" => print_state(&session)?,
            command if command.starts_with('/') => {
                println!("unknown command {command}; try /help");
            }
            // Submit the line as typed; the session records it verbatim.
            _ => match session.submit(&line).await {
                Ok(reply) => println!("{agent}: {reply}"),
                Err(e) => eprintln!("colloquy: {e}"),
            },
        }
    }

    if let Some(path) = &args.transcript {
        export_transcript(path, &session, &agent)?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("you: ");
    std::io::stdout().flush()
}

fn print_last_agent_turn(session: &Session, agent: &str) {
    if let Some(turn) = session.transcript().last() {
        if turn.speaker == Speaker::Agent {
            println!("{agent}: {}", turn.text);
        }
    }
}

fn print_help() {
    println!("/reset       start the conversation over");
    println!("/transcript  show the recorded turns");
    println!("/state       show the accumulated context state");
    println!("/quit        leave (also /exit)");
}

fn print_transcript(session: &Session, agent: &str) {
    for turn in session.transcript() {
        let who = match turn.speaker {
            Speaker::User => "you",
            Speaker::Agent => agent,
        };
        println!("{:>3}  {who}: {}", turn.sequence, turn.text);
    }
}

fn print_state(session: &Session) -> Result<(), CliError> {
    let state = session.state();
    if state.is_empty() {
        println!("(no state yet)");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn export_transcript(path: &Path, session: &Session, agent: &str) -> Result<(), CliError> {
    let export = TranscriptExport {
        session: session.id().to_string(),
        agent: agent.to_string(),
        turns: session.transcript(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&export)?)?;
    tracing::info!(path = %path.display(), turns = export.turns.len(), "wrote transcript");
    Ok(())
}
