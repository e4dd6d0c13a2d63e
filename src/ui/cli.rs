//! Command-line surface: `clap` derive structures mirroring the teacher's
//! `ui::cli::Cli`/`Commands`, trimmed to this crate's single operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::colors::{ColorMode, Theme};

#[derive(Debug, Parser)]
#[command(name = "asyncapi-hoist", version, about = "Hoists and deduplicates inlined schemas in a resolved AsyncAPI document")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  #[arg(long, global = true, value_enum, default_value = "auto")]
  pub color: ColorMode,

  #[arg(long, global = true, value_enum, default_value = "default")]
  pub theme: Theme,

  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  pub verbose: u8,

  #[arg(short, long, global = true)]
  pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Run the full hoisting/normalization pipeline on a document.
  Normalize(NormalizeCommand),
}

#[derive(Debug, clap::Args)]
pub struct NormalizeCommand {
  /// Input AsyncAPI document (YAML or JSON, detected by extension).
  #[arg(short, long)]
  pub input: PathBuf,

  /// Where to write the normalized document. Defaults to overwriting the input.
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Also run the independent channel-ref rewriter pass.
  #[arg(long)]
  pub rewrite_channels: bool,
}
