use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

mod app;
mod cache;
mod clockify;
mod config;
mod console;
mod datetime;
mod fetch;
mod init_command;
mod list_command;
mod logger;
mod messages;
mod submission;
mod terminal;
mod time_entry;
mod time_parser;
mod validation;
mod wizard;

use app::{App, EffectRunner};
use cache::Cache;
use clockify::ClockifyClient;
use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use init_command::{InitArgs, InitCommand};
use list_command::{ListArgs, ListCommand};

/// Clockifyのtime entryを閲覧・作成・編集するためのターミナルアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- init --api-key <KEY>
/// $ cargo run
/// $ cargo run -- new
/// $ cargo run -- list --date 2024-01-15
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short = 'v', long = "verbose", global = true, help = "Writes debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: Option<SubCommands>,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Opens the time entry list (default)
    Run,
    /// Opens only the new time entry form
    New,
    /// Prints recent time entries as a Markdown list
    List(ListArgs),
    /// Stores the API key, user and workspace in the config file
    Init(InitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = logger::init(args.verbose)?;
    info!("Logging to {}", log_path.display());

    match args.subcommand.unwrap_or(SubCommands::Run) {
        SubCommands::Run => run_ui(false).await?,
        SubCommands::New => run_ui(true).await?,
        SubCommands::List(list) => {
            let config = load_config()?;
            let client = ClockifyClient::new(&config.api_key);
            let cache = Cache::new();
            let entries = ListCommand::new(&client, &cache).run(&config, list).await?;
            let projects = fetch::read_projects(&client, &cache, &config.workspace_id).await?;

            let mut stdout = io::stdout();
            let mut presenter = ConsoleMarkdownList::new(&mut stdout, &projects);
            presenter.show_time_entries(&entries)?;
        }
        SubCommands::Init(init) => {
            let client = ClockifyClient::new(&init.api_key);
            let config = InitCommand::new(&client).run(init).await?;
            let path = config.save()?;
            println!(
                "Using workspace \"{}\". Config saved to {}",
                config.workspace_name,
                path.display()
            );
        }
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load config")?;
    config.ensure_complete()?;
    Ok(config)
}

/// 画面を表示する。`standalone`が`true`の場合は新規作成のウィザードだけを表示する。
async fn run_ui(standalone: bool) -> Result<()> {
    let config = load_config()?;
    let cache = Arc::new(Cache::new());
    let repository = Arc::new(ClockifyClient::new(&config.api_key));
    let runner = EffectRunner::new(repository, Arc::clone(&cache), &config);

    let app = if standalone {
        App::standalone(config, cache)
    } else {
        App::new(config, cache)
    };
    terminal::run(app, runner).await
}
