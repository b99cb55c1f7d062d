//! Build automation tasks for the auto ingest workspace
//!
//! - Generating the operator CLI reference from the clap definitions

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for auto ingest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &Path) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<autoingest_cli::Cli>();

    let content = format!(
        r#"# Auto Ingest CLI Reference

Generated from the CLI source on {}.

The `autoingest` binary inspects and repairs the shared state of an auto
ingest cluster: case folders, coordination node data and case logs.

## Environment Variables

- `AUTOINGEST_COORDINATION_DIR` - shared coordination directory (default: `./coordination`)
- `AUTOINGEST_CASES_DIR` - root holding case folders (default: `./cases`)
- `AUTOINGEST_HOST_NAME` - name this node writes into logs and lock files
- `AUTOINGEST_LOCK_TIMEOUT_SECS` - wait for the case log lock, at most `86400` (default: `900`)
- `AUTOINGEST_LOCK_POLL_MS` - pause between lock attempts (default: `250`)
- `AUTOINGEST_STALE_LOCK_SECS` - age after which a lock is broken, `0` to never break, otherwise at least `60` (default: `3600`)
- `AUTOINGEST_MAX_ATTEMPTS` - retries for a crashed job (default: `2`)
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILTER` - diagnostic logging

## Examples

```bash
# List cases and their status
autoingest cases

# Decode a manifest record copied from a node
autoingest node-data decode --hex 000000010000000500000000

# Move a job to the front of the queue
autoingest node-data set-priority /input/Case\ X/manifest.xml 100

# Requeue a job a crashed node left in processing
autoingest recover /input/Case\ X/manifest.xml --case-name "Case X" --data-source /input/Case\ X/disk.E01
```

{}
"#,
        chrono::Local::now().format("%Y-%m-%d"),
        markdown
    );

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let output_file = output_dir.join("cli-reference.md");
    fs::write(&output_file, content).with_context(|| format!("Failed to write {}", output_file.display()))?;

    println!("✓ Generated CLI documentation: {}", output_file.display());

    Ok(())
}
