use clap::{Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use tasklist::app::{App, Command};
use tasklist::config::Config;
use tasklist::prompt::TerminalPrompt;
use tasklist::shell;
use tasklist::sound::{CommandOutput, SoundProvider, SoundSearch};
use tasklist::storage::SqliteStorage;
use tasklist::store::TaskStore;
use tasklist::{Filter, TaskId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Tasklist - a small to-do list for the terminal")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the task database (default: platform data dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/tasklist/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Answer yes to confirmations
    #[arg(short, long)]
    yes: bool,

    /// Never fetch or play sounds
    #[arg(long)]
    no_sound: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show tasks
    List {
        #[arg(short, long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },

    /// Mark a task complete, or incomplete again
    #[command(alias = "done")]
    Toggle { id: TaskId },

    /// Change a task's text (asks for it when omitted)
    Edit { id: TaskId, text: Vec<String> },

    /// Delete a task
    #[command(alias = "rm")]
    Delete { id: TaskId },

    /// Delete all tasks
    Clear,

    /// Interactive session (default)
    Shell,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_sound(config: &Config, no_sound: bool) -> SoundProvider {
    if no_sound || !config.sound.enabled {
        debug!("Sound disabled");
        return SoundProvider::disabled();
    }

    let Some(program) = &config.sound.player else {
        debug!("No audio player configured, sound disabled");
        return SoundProvider::disabled();
    };
    let output = CommandOutput::new(program.clone(), config.sound.player_args.clone());
    SoundProvider::new(SoundSearch::new(&config.sound), Box::new(output))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };

    // Open store; the lock is held until the process exits
    let storage = SqliteStorage::open(&data_dir)?;
    let _lock = storage.lock()?;
    let store = TaskStore::load(storage)?;

    let mut app = App::new(store, build_sound(&config, cli.no_sound));
    let mut prompt = TerminalPrompt::stdin(cli.yes);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let command = match cli.command.unwrap_or(Commands::Shell) {
            Commands::Shell => {
                let mut stdout = std::io::stdout();
                return shell::run(&mut app, &mut prompt, &mut stdout).await;
            }
            Commands::List { filter } => Command::SetFilter(filter),
            Commands::Add { text } => Command::Add(text.join(" ")),
            Commands::Toggle { id } => Command::Toggle(id),
            Commands::Edit { id, text } if text.is_empty() => match shell::edit_command(&app, id, &mut prompt) {
                Some(command) => command,
                None => return Ok(()),
            },
            Commands::Edit { id, text } => Command::Edit(id, text.join(" ")),
            Commands::Delete { id } => Command::Delete(id),
            Commands::Clear => Command::ClearAll,
        };

        app.prepare(&command).await;
        app.dispatch(command, &mut prompt, &mut std::io::stdout())?;
        Ok::<(), eyre::Report>(())
    })
}
