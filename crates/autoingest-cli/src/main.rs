//! Auto Ingest CLI - Main entry point

use autoingest_cli::commands::recover::RecoverArgs;
use autoingest_cli::{Cli, Commands, NodeDataCommand};
use autoingest_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = &cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("autoingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().with_env_overrides().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(command, cli.json) {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn execute_command(command: &Commands, json: bool) -> autoingest_cli::Result<()> {
    match command {
        Commands::Cases { root } => autoingest_cli::commands::cases::run(root.clone(), json),

        Commands::CaseStatus { case_dir } => autoingest_cli::commands::case_status::run(case_dir.clone(), json),

        Commands::NodeData { command } => match command {
            NodeDataCommand::Decode { file, hex } => {
                autoingest_cli::commands::node_data::decode(file.clone(), hex.clone(), json)
            },
            NodeDataCommand::Show { manifest } => autoingest_cli::commands::node_data::show(manifest.clone(), json),
            NodeDataCommand::SetPriority { manifest, priority } => {
                autoingest_cli::commands::node_data::set_priority(manifest.clone(), *priority, json)
            },
        },

        Commands::Log {
            case_dir,
            manifest,
            data_source,
            category,
            message,
        } => autoingest_cli::commands::log::run(
            case_dir.clone(),
            manifest.clone(),
            data_source.clone(),
            *category,
            message.clone(),
        ),

        Commands::Recover {
            manifest,
            case_name,
            data_source,
            device_id,
            cases_root,
        } => autoingest_cli::commands::recover::run(
            RecoverArgs {
                manifest: manifest.clone(),
                case_name: case_name.clone(),
                data_source: data_source.clone(),
                device_id: device_id.clone(),
                cases_root: cases_root.clone(),
            },
            json,
        ),
    }
}
