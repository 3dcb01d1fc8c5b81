use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use geminify_core::request::load_attachments;
use geminify_core::{
    Command, GeminiClient, Launch, Orchestrator, Preferences, Session, SqliteHistory,
};

mod form;
mod selection;
mod terminal;

use terminal::TerminalUi;

#[derive(Parser)]
#[command(name = "geminify")]
#[command(about = "Quick Gemini commands for selected text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct QuickArgs {
    /// Text to send along with the selection (opens a prompt when empty)
    query: Vec<String>,
    /// Use this as the selected text instead of stdin or the clipboard
    #[arg(short, long)]
    selection: Option<String>,
    /// Model to use ("default" defers to the configured model)
    #[arg(short, long)]
    model: Option<String>,
    /// Files to attach (images, PDFs, text)
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,
    /// Show the response as a diff against the selection
    #[arg(long, overrides_with = "no_diff")]
    diff: bool,
    #[arg(long = "no-diff")]
    no_diff: bool,
    /// Send a zero thinking budget to the thinking model
    #[arg(long)]
    disable_thinking: bool,
    /// Copy the result to the clipboard
    #[arg(long)]
    copy: bool,
    /// Print only the raw response (no diff markup), for piping back into an editor
    #[arg(long)]
    paste: bool,
    /// Write the exchange as chat messages (JSON) for a chat client
    #[arg(long, value_name = "PATH")]
    handoff: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Comment on the selected text
    Comment(QuickArgs),
    /// Explain the selected text
    Explain(QuickArgs),
    /// Ask a question about the selected text
    Ask(QuickArgs),
    /// Translate the selected text
    Translate {
        #[command(flatten)]
        args: QuickArgs,
        /// Target language (defaults to the configured language pair)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Show or clear the command history
    History {
        /// Maximum number of entries
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Delete all entries
        #[arg(long)]
        clear: bool,
    },
    /// Show or change preferences
    Config {
        #[arg(long)]
        api_key: Option<String>,
        /// Global default model
        #[arg(long)]
        model: Option<String>,
        /// Custom model overriding the default (empty string to unset)
        #[arg(long)]
        custom_model: Option<String>,
        #[arg(long)]
        show_diff: Option<bool>,
        #[arg(long)]
        disable_thinking: Option<bool>,
        #[arg(long)]
        default_language: Option<String>,
        #[arg(long)]
        second_language: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("GEMINIFY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Comment(args) => run_quick_command(Command::Comment, args, None).await,
        Commands::Explain(args) => run_quick_command(Command::Explain, args, None).await,
        Commands::Ask(args) => run_quick_command(Command::Ask, args, None).await,
        Commands::Translate { args, language } => {
            run_quick_command(Command::Translate, args, language).await
        }
        Commands::History { limit, clear } => {
            show_history(limit, clear)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            api_key,
            model,
            custom_model,
            show_diff,
            disable_thinking,
            default_language,
            second_language,
        } => {
            // read the file directly so an API key from the environment is never persisted
            let mut prefs = Preferences::load_from(&Preferences::get_config_path()?)?;
            let changed = api_key.is_some()
                || model.is_some()
                || custom_model.is_some()
                || show_diff.is_some()
                || disable_thinking.is_some()
                || default_language.is_some()
                || second_language.is_some();

            if let Some(key) = api_key {
                prefs.api_key = Some(key);
            }
            if let Some(model) = model {
                prefs.model = model;
            }
            if let Some(custom) = custom_model {
                prefs.custom_model = Some(custom).filter(|c| !c.trim().is_empty());
            }
            if let Some(show_diff) = show_diff {
                prefs.show_diff = show_diff;
            }
            if let Some(disable_thinking) = disable_thinking {
                prefs.disable_thinking = disable_thinking;
            }
            if let Some(language) = default_language {
                prefs.default_target_language = language;
            }
            if let Some(language) = second_language {
                prefs.second_target_language = language;
            }

            if changed {
                prefs.save()?;
                println!("{}", "Preferences saved".green());
            }
            print_preferences(&prefs)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_quick_command(
    command: Command,
    args: QuickArgs,
    language: Option<String>,
) -> Result<ExitCode> {
    let mut prefs = Preferences::load().unwrap_or_else(|e| {
        warn!("Could not load preferences, using defaults: {:#}", e);
        Preferences::new()
    });
    if args.diff {
        prefs.show_diff = true;
    }
    if args.no_diff {
        prefs.show_diff = false;
    }
    if args.disable_thinking {
        prefs.disable_thinking = true;
    }

    let mut options = command.options(&prefs, language.as_deref());
    if args.paste && !options.allow_paste {
        bail!("{} does not support --paste", command.display_name());
    }
    if let Some(model) = &args.model {
        options.model = Some(model.clone());
    }
    options.buffer = load_attachments(&args.files);

    let api_key = prefs.require_api_key()?.to_string();
    let client = match prefs.api_base_url.as_deref() {
        Some(base_url) => GeminiClient::with_base_url(&api_key, base_url),
        None => GeminiClient::new(&api_key),
    };
    let history = SqliteHistory::open_default().context("Could not open the history database")?;

    let mut session = Session::new(options);
    let mut ui = TerminalUi::new(args.paste);
    let query = args.query.join(" ");

    let spec = match session.launch(
        &query,
        || selection::read_selection(args.selection.as_deref()),
        &mut ui,
    ) {
        Launch::Submit(spec) => spec,
        Launch::ShowForm => form::run(&mut session, &mut ui)?,
    };

    let mut orchestrator = Orchestrator::new(client, history, prefs);
    if orchestrator
        .acquire_response(spec, &mut session, &mut ui)
        .await
        .is_err()
    {
        return Ok(ExitCode::FAILURE);
    }

    if args.paste {
        let text = session.last_response().unwrap_or(session.markdown());
        println!("{}", text);
    }
    if args.copy {
        match selection::copy_to_clipboard(session.markdown()) {
            Ok(()) => eprintln!("{}", "Copied to clipboard".dimmed()),
            Err(e) => eprintln!("{}: {}", "Could not copy to clipboard".red(), e),
        }
    }
    if let Some(path) = args.handoff {
        if let Some(messages) = session.chat_handoff() {
            std::fs::write(&path, serde_json::to_string_pretty(&messages)?)
                .with_context(|| format!("Could not write {}", path.display()))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn show_history(limit: usize, clear: bool) -> Result<()> {
    let mut history = SqliteHistory::open_default()?;

    if clear {
        let removed = history.clear()?;
        println!("{} {} entries", "Cleared".green(), removed);
        return Ok(());
    }

    let entries = history.list(limit)?;
    if entries.is_empty() {
        println!("{}", "No history yet".yellow());
        return Ok(());
    }

    println!("\n{}", "🕘 Command History".bold().blue());
    println!("{}", "=".repeat(40).dimmed());
    for entry in entries {
        println!(
            "\n{}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M").to_string().bold().yellow(),
            entry.model.dimmed()
        );
        println!("{} {}", "Q:".bold().cyan(), entry.query);
        println!("{} {}", "A:".bold().green(), entry.response);
    }

    Ok(())
}

fn print_preferences(prefs: &Preferences) -> Result<()> {
    let masked = prefs.api_key.as_deref().map(|key| {
        let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("****{}", visible)
    });

    println!("{} {}", "Config file:".bold(), Preferences::get_config_path()?.display());
    println!("  api key:          {}", masked.unwrap_or_else(|| "(not set)".to_string()));
    println!("  model:            {}", prefs.model);
    println!(
        "  custom model:     {}",
        prefs.custom_model.as_deref().unwrap_or("(none)")
    );
    println!("  show diff:        {}", prefs.show_diff);
    println!("  disable thinking: {}", prefs.disable_thinking);
    println!(
        "  languages:        {} / {}",
        prefs.default_target_language, prefs.second_target_language
    );
    Ok(())
}
