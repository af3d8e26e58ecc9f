// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;

use cli::crawl_cmd::CrawlArgs;

#[derive(Parser)]
#[command(
    name = "shopcrawl",
    about = "Shopcrawl: crawl e-commerce category listings into a flat product table",
    version,
    after_help = "Run 'shopcrawl <command> --help' for details on each command.\nRun 'shopcrawl' with no command to crawl with the resolved configuration."
)]
struct Cli {
    /// Configuration file (JSON). Falls back to SHOPCRAWL_CONFIG, then ./shopcrawl.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "shopcrawl=trace")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured section and export the records
    Crawl(CrawlArgs),
    /// Print the sections a crawl would visit
    Sections,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_logging(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    let config = cli.config.as_deref();
    let result = match cli.command {
        None => cli::crawl_cmd::run(config, CrawlArgs::default()).await,
        Some(Commands::Crawl(args)) => cli::crawl_cmd::run(config, args).await,
        Some(Commands::Sections) => cli::sections_cmd::run(config),
        Some(Commands::Doctor) => cli::doctor::run(config).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "shopcrawl", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
