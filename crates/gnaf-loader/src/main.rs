//! G-NAF Loader - Main entry point

use clap::Parser;
use gnaf_common::logging::{init_logging, LogConfig, LogLevel};
use gnaf_loader::commands::{decompress, import_data, queue, truncate_tables};
use gnaf_loader::{Cli, Commands, LogContext};
use std::process;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env before clap so env-backed settings see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .build();

    // Environment variables take precedence over the flag
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    // The guard keeps the subscriber installed until the command returns
    let _logging = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    let log = LogContext::for_command(command.name());

    if let Err(e) = execute_command(command, &log).await {
        error!(parent: log.span(), error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the loader command
async fn execute_command(command: Commands, log: &LogContext) -> gnaf_loader::Result<()> {
    match command {
        Commands::Decompress {
            source_bucket,
            source_file_name,
            destination_bucket,
            destination_folder,
        } => {
            decompress::execute(
                &source_bucket,
                &source_file_name,
                &destination_bucket,
                &destination_folder,
                log,
            )
            .await
        },

        Commands::Queue {
            queue_name,
            bucket_name,
            key_name,
        } => queue::execute(&queue_name, &bucket_name, &key_name, log).await,

        Commands::TruncateTables { db } => truncate_tables::execute(db.to_config(), log).await,

        Commands::ImportData {
            queue_name,
            temp_dir,
            db,
        } => import_data::execute(&queue_name, &temp_dir, db.to_config(), log).await,
    }
}
