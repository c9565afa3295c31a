// tools/dump_context/main.rs
// Concatenate every text file of a project into one report for AI context.
// Ignored folders (node_modules, build, .git, ...) are pruned and binary
// assets are skipped. Optionally strips comments/blank lines to save tokens.
//
// Run with:
//   cargo run --bin dump_context -- ./MyApp
// or specify output path:
//   cargo run --bin dump_context -- ./MyApp -o ./data/context.txt

mod compress;
mod report;
mod walker;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::compress::CompressionMode;

#[derive(Debug, Parser)]
#[command(about = "Merge all text files under a project directory into one txt file for AI context.")]
struct Cli {
    /// Project root directory to scan.
    path: PathBuf,
    /// Output txt file.
    #[arg(short, long, default_value = "project_context.txt")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    let stdin = io::stdin();
    let mode = prompt_mode(&mut stdin.lock(), &mut io::stdout())?;

    let summary = report::generate_project_context(&cli.path, &cli.output, mode)
        .with_context(|| format!("dump of '{}' failed", cli.path.display()))?;

    info!(
        "Done. {} file(s) written, {} skipped -> {}",
        summary.written,
        summary.skipped,
        summary.output.display()
    );
    Ok(())
}

/// Ask for the compression mode until a valid choice is entered.
fn prompt_mode<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> anyhow::Result<CompressionMode> {
    loop {
        writeln!(out, "\nSelect compression:")?;
        writeln!(out, "  1: none (keep original formatting)")?;
        writeln!(out, "  2: compressed (JS/TS oriented; drops comments, blank lines and newlines)")?;
        write!(out, "Enter 1 or 2: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no compression mode selected (stdin closed)");
        }
        match CompressionMode::from_choice(&line) {
            Some(mode) => return Ok(mode),
            None => writeln!(out, "\nInvalid input, please enter 1 or 2.")?,
        }
    }
}
