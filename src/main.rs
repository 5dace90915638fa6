use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bytepatch::apply::{self, ApplyOptions, WriteMode};
use bytepatch::create;

#[derive(Parser)]
#[command(
    name = "bytepatch",
    version,
    about = "Byte-level patch creator and applier for single files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Clone, Copy)]
struct OutputArgs {
    /// Print a summary of the work done (repeat for debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the summary as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a patch from an original and a modified file of the same length
    Create {
        /// The source file
        original_file: PathBuf,
        /// The file to compare to
        modified_file: PathBuf,
        /// Where to write the patch
        output_file: PathBuf,
    },
    /// Apply a patch to a copy of the original file
    Apply {
        /// The file to be patched in place
        target_file: PathBuf,
        /// The patch file
        patch_file: PathBuf,
        /// Patch a temporary copy and rename it over the target
        #[arg(long)]
        atomic: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.output.verbose);

    match cli.command {
        Commands::Create {
            original_file,
            modified_file,
            output_file,
        } => run_create(&original_file, &modified_file, &output_file, cli.output),
        Commands::Apply {
            target_file,
            patch_file,
            atomic,
        } => {
            let opts = ApplyOptions {
                mode: if atomic {
                    WriteMode::Atomic
                } else {
                    WriteMode::InPlace
                },
            };
            run_apply(&target_file, &patch_file, opts, cli.output)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .init();
}

fn run_create(
    original: &Path,
    modified: &Path,
    output: &Path,
    out: OutputArgs,
) -> Result<()> {
    let start = Instant::now();
    let summary = create::create_patch(original, modified, output).with_context(|| {
        format!(
            "Failed to create patch from {} and {}",
            original.display(),
            modified.display()
        )
    })?;
    let elapsed = start.elapsed();

    if out.json {
        return print_json(&summary);
    }

    if !summary.patch_written {
        println!("No differences found between the files.");
        return Ok(());
    }

    if out.verbose > 0 {
        println!("Patch file generated: {}", output.display());
        println!("  Original hash: {}", summary.original_digest);
        println!("  Bytes written: {}", summary.bytes_changed);
        println!("  Bytes unchanged: {}", summary.bytes_unchanged);
        println!("  Patch size: {} bytes", summary.patch_size);
        println!("  Time elapsed: {:.3}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn run_apply(
    target: &Path,
    patch: &Path,
    opts: ApplyOptions,
    out: OutputArgs,
) -> Result<()> {
    let start = Instant::now();
    let summary = apply::apply_patch(target, patch, opts).with_context(|| {
        format!(
            "Failed to apply {} to {}",
            patch.display(),
            target.display()
        )
    })?;
    let elapsed = start.elapsed();

    if out.json {
        return print_json(&summary);
    }

    if out.verbose > 0 {
        println!("Patch applied successfully to: {}", target.display());
        println!("  Bytes applied: {}", summary.bytes_applied);
        println!("  Time elapsed: {:.3}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn print_json<T: Serialize>(summary: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}
