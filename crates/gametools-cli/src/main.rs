//! gametools: launch-day helpers for game designers.
//!
//! Credentials come from the environment (or `.env`): TINIFY_API_KEY,
//! GC_SERVICE_KEY_B64 or GOOGLE_ACCESS_TOKEN, SHEET_ID. Tracker keys are
//! stored per designer in the spreadsheet via `account save`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gametools_cli::{
    classification_line, error_report, init_tracing, log_failure, print_json, read_uploads,
    render_accounts, render_bundle, render_lookup, render_outcome, write_bundle,
};
use gametools_core::{AppError, BundleProfile, Config, DuplicateMatchSetting, SessionContext};
use gametools_services::{
    BundleTarget, FetchOutcome, FetchSettings, LaunchFetcher, LinearClient, ProviderDirectory,
    SheetsClient, SpreadsheetStore, ThumbnailBundler, TinifyClient, UserKeyStore,
};

#[derive(Parser)]
#[command(name = "gametools", about = "Game launch tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Saved designer settings
    Account {
        #[command(subcommand)]
        sub: AccountCommands,
    },
    /// Show the launches due on a day with duplicates and provider logins
    Fetch {
        /// Designer whose saved tracker key and state are used
        #[arg(long)]
        designer: String,
        /// Due date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Duplicate matching: exact, substring or fuzzy
        #[arg(long)]
        match_mode: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compress, convert and zip thumbnails for one game
    Bundle {
        /// Defaults to the base title of --issue
        #[arg(long, required_unless_present = "issue")]
        game_name: Option<String>,
        /// Full title of one of the day's launch tickets
        #[arg(long, requires = "designer")]
        issue: Option<String>,
        /// Designer whose launches --issue is picked from
        #[arg(long)]
        designer: Option<String>,
        /// Due date of the launches (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// standard or full
        #[arg(long)]
        profile: Option<String>,
        /// Directory the zip is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,
        /// Image files; names must contain box, portrait or landscape
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show which role each file name maps to
    Classify {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Look up provider logins for a ticket title
    Provider {
        /// Title such as "Mystic Forest - Acme/Zed"
        title: String,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// List saved designers
    List,
    /// Save or replace a designer's tracker key and state
    Save {
        #[arg(long)]
        designer: String,
        #[arg(long)]
        key: String,
        /// Tracker column / workflow state to fetch from
        #[arg(long)]
        state: String,
    },
}

fn sheets(config: &Config) -> anyhow::Result<Arc<dyn SpreadsheetStore>> {
    let client = SheetsClient::from_config(config)?;
    Ok(Arc::new(client))
}

/// Start the designer's session and fetch the launches due on `date`
async fn fetch_launches(
    config: &Config,
    designer: &str,
    date: Option<NaiveDate>,
) -> anyhow::Result<(SessionContext, FetchOutcome)> {
    let store = sheets(config)?;
    let user = UserKeyStore::from_config(store.clone(), config)
        .require(designer)
        .await?;
    let mut session = SessionContext::start(user)?;

    let fetcher = LaunchFetcher::new(
        Arc::new(LinearClient::from_config(config)?),
        store,
        FetchSettings::from_config(config),
    );
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let outcome = fetcher.fetch(&mut session, date).await?;
    Ok((session, outcome))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Classify { files } = &cli.command {
        for name in files {
            println!("{}", classification_line(name));
        }
        return Ok(());
    }

    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        // handled before config is loaded
        Commands::Classify { .. } => {}
        Commands::Account { sub } => {
            let store = UserKeyStore::from_config(sheets(&config)?, &config);
            match sub {
                AccountCommands::List => {
                    let accounts = store.load().await?;
                    print!("{}", render_accounts(&accounts));
                }
                AccountCommands::Save {
                    designer,
                    key,
                    state,
                } => {
                    let user = store.save(&designer, &key, &state).await?;
                    println!("Saved settings for {}", user.designer);
                }
            }
        }
        Commands::Fetch {
            designer,
            date,
            match_mode,
            json,
        } => {
            if let Some(mode) = match_mode {
                config.duplicate_match_mode = mode.parse::<DuplicateMatchSetting>()?;
            }
            let (_, outcome) = fetch_launches(&config, &designer, date).await?;
            if json {
                print_json(&outcome)?;
            } else {
                print!("{}", render_outcome(&outcome));
            }
        }
        Commands::Bundle {
            game_name,
            issue,
            designer,
            date,
            profile,
            output,
            files,
        } => {
            if let Some(profile) = profile {
                config.bundle_profile = profile.parse::<BundleProfile>()?;
            }
            let target = match (issue, designer) {
                (Some(title), Some(designer)) => {
                    let (session, _) = fetch_launches(&config, &designer, date).await?;
                    Some(BundleTarget::from_session(&session, &title)?)
                }
                _ => None,
            };
            let game_name = game_name
                .or_else(|| target.as_ref().map(|t| t.game_name.clone()))
                .ok_or_else(|| AppError::MissingField("game name".to_string()))?;

            let uploads = read_uploads(&files)?;
            let compressor = Arc::new(TinifyClient::from_config(&config)?);
            let bundle = ThumbnailBundler::from_config(&config, compressor)
                .run(uploads, &game_name)
                .await?;
            let path = write_bundle(&output, &bundle)?;
            print!("{}", render_bundle(&path, &bundle, target.as_ref()));
        }
        Commands::Provider { title } => {
            let rows = sheets(&config)?.read_rows(&config.provider_range).await?;
            let directory =
                ProviderDirectory::from_rows(&rows)?.with_policy(config.provider_match_policy);
            print!("{}", render_lookup(&title, &directory.lookup_title(&title)));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_failure(&err);
            let report = error_report(&err);
            eprintln!("Error: {}", report.message);
            if let Some(hint) = report.hint {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(u8::try_from(report.exit_code).unwrap_or(1))
        }
    }
}
