//! Unfollower binary entry point

use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use unfollower::cli::{self, Cli};
use unfollower::config::AppConfig;
use unfollower::data::Database;
use unfollower::error::AppError;
use unfollower::github::{GitHubClient, Pacer};
use unfollower::logging;
use unfollower::service::{BatchOptions, Reconciler};

/// Application entry point
///
/// # Setup
/// 1. Load `.env` and parse flags
/// 2. Load configuration from file and environment
/// 3. Initialize tracing/logging
/// 4. Run the requested actions until done or interrupted
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if !cli.has_action() {
        // Nothing useful to print if stdout is gone
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = run(cli, config) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                tracing::error!(%error, kind = error.kind(), "Run failed");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Operation cancelled by user");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    cli.check_config(&config)?;
    tracing::info!(
        username = %config.github.username,
        batch_size = config.batch.batch_size,
        "Configuration loaded"
    );

    let db = Arc::new(Database::connect(&config.database.path).await?);
    let mut reconciler = if cli.needs_remote() {
        let pacer = Arc::new(Pacer::from_config(&config.pacing));
        let client = GitHubClient::new(&config.github, pacer.clone())?;
        Some(Reconciler::new(
            client,
            db.clone(),
            pacer,
            config.github.username.clone(),
            BatchOptions {
                unknown_policy: config.batch.unknown_verification,
            },
        ))
    } else {
        None
    };
    let max = cli.max.unwrap_or(config.batch.max_unfollows_per_run);

    if cli.stats {
        print!("{}", cli::render_stats(&db.stats().await?));
    }

    if let (true, Some(reconciler)) = (cli.rate_limit, reconciler.as_mut()) {
        let status = reconciler.client_mut().rate_limit_status().await?;
        print!("{}", cli::render_rate_limit(&status));
    }

    for login in &cli.forget {
        if db.forget_unfollowed(login).await? {
            println!("Removed {login} from the unfollowed ledger");
        } else {
            println!("{login} is not in the unfollowed ledger");
        }
    }

    if cli.forget_all {
        let cleared = db.clear_unfollowed().await?;
        println!("Cleared {cleared} entries from the unfollowed ledger");
    }

    if let (true, Some(reconciler)) = (cli.sync, reconciler.as_mut()) {
        reconciler.sync().await?;
    }

    if cli.dry_run {
        let candidates = match reconciler.as_ref() {
            Some(reconciler) => reconciler.preview(max).await?,
            None => db.candidates_to_unfollow(Some(max)).await?,
        };
        print!("{}", cli::render_dry_run(&candidates));
    } else if let (true, Some(reconciler)) = (cli.unfollow, reconciler.as_mut()) {
        let report = reconciler.unfollow_batch(max).await?;
        println!(
            "\nUnfollowed {} users ({} failed, {} already not followed, {} skipped)",
            report.unfollowed, report.failed, report.already_resolved, report.skipped
        );
    }

    if let Some(limit) = cli.history {
        print!("{}", cli::render_history(&db.recent_status(limit).await?));
    }

    if cli.stats && (cli.sync || cli.unfollow || cli.forget_all || !cli.forget.is_empty()) {
        print!("{}", cli::render_stats(&db.stats().await?));
    }

    Ok(())
}
