//! complaint-console: staff console for the complaint management backend
//!
//! Signs staff in, pages through complaints, appends notes and moves
//! complaints through their status workflow under an advisory edit lock.

use std::path::PathBuf;

use clap::Parser;
use complaint_client::Session;
use tracing::debug;

use complaint_console::cli::{execute_command, Commands};
use complaint_console::{Console, ConsoleConfig};

#[derive(Parser)]
#[command(name = "complaint-console")]
#[command(about = "Staff console for complaint management")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "COMPLAINT_CONFIG", default_value = "complaint-console.toml")]
    config: PathBuf,

    /// REST API base URL (overrides config file)
    #[arg(long, env = "COMPLAINT_API_URL")]
    api_url: Option<String>,

    /// Session file (overrides config file)
    #[arg(long, env = "COMPLAINT_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Complaints per page (overrides config file)
    #[arg(long, env = "COMPLAINT_PAGE_SIZE")]
    page_size: Option<u64>,

    /// Edit lock lifetime in seconds (overrides config file)
    #[arg(long, env = "COMPLAINT_LOCK_TTL_SECS")]
    lock_ttl_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("complaint_console=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConsoleConfig::load(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    if let Some(lock_ttl_secs) = cli.lock_ttl_secs {
        config.lock_ttl_secs = lock_ttl_secs;
    }
    debug!(api_url = %config.api_url, "Configuration loaded");

    let session_file = config.session_file.clone();
    let session = Session::load(&session_file)?;
    let console = Console::new(config, session)?;

    let result = execute_command(&console, cli.command).await;

    console.session().persist(&session_file)?;
    debug!(signed_in = console.session().is_authenticated(), "Session saved");

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message(&e.to_string()));
            std::process::exit(1);
        }
    }
}
