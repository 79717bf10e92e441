//! # cas CLI entry point
//!
//! Parses command-line arguments, sets up logging and the Tokio runtime,
//! and dispatches to subcommand handlers. Ctrl-C and SIGTERM cancel a
//! shared token: uploads in flight stop and remove their temp files, and
//! `serve` shuts down gracefully.

use std::process::ExitCode;

use anyhow::Result;
use cas_client::Client;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cas_cli::commands::add::{run_add, AddArgs};
use cas_cli::commands::cat::{run_cat, CatArgs};
use cas_cli::commands::hash::{run_hash, HashArgs};
use cas_cli::commands::init::{run_init, InitArgs};
use cas_cli::commands::list::run_list;
use cas_cli::commands::serve::{run_serve, ServeArgs};
use cas_cli::commands::status::run_status;
use cas_cli::commands::verify::run_verify;

/// Local content-addressed storage with deduplication.
///
/// Set `CAS_SERVER_URL` to run `add`, `ls`, `cat`, `status`, and `verify`
/// against a remote `cas serve` instead of `./.cas`.
#[derive(Parser, Debug)]
#[command(name = "cas", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a CAS repository in the working directory.
    Init(InitArgs),

    /// Print the fingerprint of a file (no repository needed).
    Hash(HashArgs),

    /// Add a file or directory to storage and the catalog.
    Add(AddArgs),

    /// List every cataloged file.
    #[command(name = "ls")]
    List,

    /// Write a cataloged file's content to stdout.
    Cat(CatArgs),

    /// Show storage and deduplication statistics.
    Status,

    /// Re-hash every cataloged blob and report damage.
    Verify,

    /// Serve the repository over HTTP.
    Serve(ServeArgs),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let default_level = match cli.verbose {
        0 if matches!(cli.command, Commands::Serve(_)) => "info",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Commands) -> Result<u8> {
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));
    let mut stdout = std::io::stdout();

    match command {
        Commands::Init(args) => run_init(&args, &mut stdout).await,
        Commands::Hash(args) => run_hash(&args, &cancel, &mut stdout).await,
        Commands::Serve(args) => run_serve(&args, &cancel).await,
        Commands::Add(args) => {
            let client = cas_cli::connect().await?;
            finish(&client, run_add(&args, &client, &cancel, &mut stdout).await).await
        }
        Commands::List => {
            let client = cas_cli::connect().await?;
            finish(&client, run_list(&client, &cancel, &mut stdout).await).await
        }
        Commands::Cat(args) => {
            let client = cas_cli::connect().await?;
            let mut out = tokio::io::stdout();
            finish(&client, run_cat(&args, &client, &cancel, &mut out).await).await
        }
        Commands::Status => {
            let client = cas_cli::connect().await?;
            finish(&client, run_status(&client, &cancel, &mut stdout).await).await
        }
        Commands::Verify => {
            let client = cas_cli::connect().await?;
            finish(&client, run_verify(&client, &cancel, &mut stdout).await).await
        }
    }
}

async fn finish(client: &Client, result: Result<u8>) -> Result<u8> {
    client.close().await;
    result
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                return;
            }
        }
        _ = terminate => {}
    }
    tracing::info!("received shutdown signal");
    cancel.cancel();
}
