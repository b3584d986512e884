//! thanks-to-me: gratitude journaling through conversation.

mod advice;
mod api;
mod chat;
mod config;
mod gateway;
mod journal;
mod mood;
mod player;
mod prompts;
mod reflection;
mod session;
mod storage;
mod summarizer;
mod transcript;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::gateway::llm::LlmGateway;
use crate::gateway::tts::TtsGateway;
use crate::journal::{render_calendar, render_report, Journal};
use crate::mood::MoodTagger;
use crate::reflection::Reflector;
use crate::storage::Store;

#[derive(Parser, Debug)]
#[command(name = "thanks-to-me", about = "Gratitude journaling through conversation")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Talk in the terminal; `/end` finishes the session
    Chat {
        /// Speak each reply aloud
        #[arg(long)]
        voice: bool,
    },
    /// Show the journal calendar and entries
    History {
        /// Month to show, YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Print the full entry for this day, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
}

fn parse_month(month: Option<&str>) -> Result<(i32, u32), String> {
    let Some(month) = month else {
        let now = Local::now();
        return Ok((now.year(), now.month()));
    };
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{month}', expected YYYY-MM"))?;
    Ok((first.year(), first.month()))
}

fn show_history(store: &Store, month: Option<&str>, date: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let journal = Journal::load(store)?;
    if journal.is_empty() {
        println!("No journal entries yet. Start with `thanks-to-me chat`.");
        return Ok(());
    }
    info!("Journal has {} entries", journal.len());

    if let Some(date) = date {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{date}', expected YYYY-MM-DD"))?;
        match journal.get(day) {
            Some(entry) => println!("{}", render_report(entry)),
            None => println!("No journal entry for {day}."),
        }
        return Ok(());
    }

    let (year, month) = parse_month(month)?;
    let cells = journal
        .month_grid(year, month)
        .ok_or_else(|| format!("invalid month {year}-{month:02}"))?;
    print!("{}", render_calendar(year, month, &cells));

    let in_month: Vec<_> = journal
        .entries()
        .filter(|e| e.date.year() == year && e.date.month() == month)
        .collect();
    if in_month.is_empty() {
        println!("\nNo entries this month.");
    }
    for entry in in_month {
        println!("\n{} [{}] {}", entry.date, entry.mood, entry.discovery);
    }
    Ok(())
}

fn build_core(config: &config::Config) -> Result<(LlmGateway, Reflector), gateway::GatewayError> {
    let gateway = LlmGateway::from_config(&config.llm)?;
    let reflector = Reflector::new(gateway.clone(), MoodTagger::from_config(&config.mood));
    info!("LLM model: {}", config.llm.model);
    Ok((gateway, reflector))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (keep HTTP internals quiet)
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info,symphonia=warn")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn,symphonia=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::load(args.config.as_deref());
    config.validate();

    let store = Store::open(config.storage.resolve_dir())?;
    info!("Journal data in {}", store.dir().display());

    let max_duration = Duration::from_secs(config.session.max_duration_secs);

    match args.command {
        Command::History { month, date } => {
            show_history(&store, month.as_deref(), date.as_deref())?;
        }
        Command::Serve => {
            let (gateway, reflector) = build_core(&config)?;
            let tts = Arc::new(TtsGateway::new(config.tts.clone())?);
            let state = api::ApiState::new(gateway, tts, Arc::new(reflector), store, max_duration);
            let addr = format!("{}:{}", config.server.host, config.server.port);
            api::serve(state, &addr).await?;
        }
        Command::Chat { voice } => {
            let (gateway, reflector) = build_core(&config)?;
            let voice = if voice && config.tts.enabled {
                match player::AudioPlayer::open() {
                    Ok(player) => {
                        let tts = Arc::new(TtsGateway::new(config.tts.clone())?);
                        Some(chat::Voice::new(tts, Arc::new(player)))
                    }
                    Err(e) => {
                        warn!("{e}; continuing without voice output");
                        None
                    }
                }
            } else {
                None
            };
            chat::run(gateway, &reflector, &store, max_duration, voice).await?;
        }
    }

    Ok(())
}
