//! Auto Ingest CLI Library
//!
//! Operator tooling for an auto ingest cluster.
//!
//! # Overview
//!
//! - **Cases**: list case folders with their status (`autoingest cases`)
//! - **Case Status**: inspect one case folder (`autoingest case-status`)
//! - **Node Data**: decode records and adjust manifest priority
//!   (`autoingest node-data decode/show/set-priority`)
//! - **Case Log**: append an entry to a case log (`autoingest log`)
//! - **Recovery**: requeue a job left behind by a crashed node
//!   (`autoingest recover`)
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod error;
pub mod output;

pub use error::{CliError, Result};

use autoingest_core::MessageCategory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Auto Ingest - cluster coordination tooling
#[derive(Parser, Debug)]
#[command(name = "autoingest")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the CLI reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List case folders under the cases root
    Cases {
        /// Cases root (defaults to AUTOINGEST_CASES_DIR)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show the status of one case folder
    CaseStatus {
        /// Case folder
        case_dir: PathBuf,
    },

    /// Inspect and update coordination node data
    NodeData {
        #[command(subcommand)]
        command: NodeDataCommand,
    },

    /// Append an entry to a case's auto ingest log
    Log {
        /// Case folder holding the log
        case_dir: PathBuf,

        /// Manifest file of the job writing the entry
        #[arg(short, long)]
        manifest: PathBuf,

        /// Data source file name
        #[arg(short, long)]
        data_source: String,

        /// Entry category (info, warning, error)
        #[arg(short, long, default_value = "info")]
        category: MessageCategory,

        /// Entry text
        message: String,
    },

    /// Requeue a job whose node crashed while processing it
    Recover {
        /// Manifest file of the job
        manifest: PathBuf,

        /// Case the manifest belongs to
        #[arg(long)]
        case_name: String,

        /// Data source the manifest points at
        #[arg(long)]
        data_source: PathBuf,

        /// Device identifier from the manifest
        #[arg(long, default_value = "")]
        device_id: String,

        /// Cases root (defaults to AUTOINGEST_CASES_DIR)
        #[arg(long)]
        cases_root: Option<PathBuf>,
    },
}

/// Node data subcommands
#[derive(Subcommand, Debug)]
pub enum NodeDataCommand {
    /// Decode a manifest or job record from a file or hex
    Decode {
        /// File holding the raw record
        #[arg(required_unless_present = "hex", conflicts_with = "hex")]
        file: Option<PathBuf>,

        /// Raw record as hex
        #[arg(long)]
        hex: Option<String>,
    },

    /// Show the coordination record of a manifest
    Show {
        /// Manifest file path
        manifest: PathBuf,
    },

    /// Change the priority of a manifest under its lock
    SetPriority {
        /// Manifest file path
        manifest: PathBuf,

        /// New priority (higher runs first)
        #[arg(allow_negative_numbers = true)]
        priority: i32,
    },
}
