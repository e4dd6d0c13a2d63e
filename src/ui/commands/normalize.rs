//! The `normalize` subcommand: load a document, run the pipeline, write it
//! back out, and print timestamped progress — mirroring the teacher's
//! `ui::commands::generate` (`format_timestamp` via `chrono::Local`, no
//! structured logging, just colored `println!`/`eprintln!`).

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::style::Stylize;
use fmmap::tokio::{AsyncMmapFile, AsyncMmapFileExt};

use asyncapi_hoist::{format, rewrite_channels};

use crate::ui::{cli::NormalizeCommand, colors::Colors};

fn format_timestamp() -> String {
  Local::now().format("%H:%M:%S%.3f").to_string()
}

fn log_info(colors: &Colors, message: &str) {
  println!("{} {}", format_timestamp().with(colors.info()), message);
}

fn log_warn(colors: &Colors, message: &str) {
  let _ = std::io::stdout().flush();
  eprintln!("{} {}", format_timestamp().with(colors.warning()), message.with(colors.warning()));
}

fn log_verbose(colors: &Colors, verbose: u8, quiet: bool, message: &str) {
  if verbose > 0 && !quiet {
    println!("{} {}", format_timestamp().with(colors.info()), message);
  }
}

fn log_success(colors: &Colors, message: &str) {
  println!("{} {}", format_timestamp().with(colors.info()), message.with(colors.success()));
}

pub async fn run(command: NormalizeCommand, colors: &Colors, quiet: bool, verbose: u8) -> Result<()> {
  let input_path = &command.input;
  let mmap = AsyncMmapFile::open(input_path).await.with_context(|| format!("reading {}", input_path.display()))?;
  let content = std::str::from_utf8(mmap.as_slice()).with_context(|| format!("{} is not valid UTF-8", input_path.display()))?;
  let spec_format = format::SpecFormat::detect(input_path, content);

  if !quiet {
    log_info(colors, &format!("loaded {}", input_path.display()));
  }
  log_verbose(colors, verbose, quiet, &format!("detected format {spec_format:?}"));

  let mut document = format::parse(spec_format, content)?;

  let stats = asyncapi_hoist::normalize(&mut document).await?;
  log_verbose(
    colors,
    verbose,
    quiet,
    &format!(
      "{} schema(s) hoisted, {} deduplicated, {} file(s) loaded on demand, {} discriminator(s) normalized, {} discriminator mapping(s) rewritten",
      stats.schemas_hoisted, stats.schemas_deduplicated, stats.files_loaded_on_demand, stats.discriminators_normalized, stats.discriminator_mappings_rewritten
    ),
  );

  let channel_stats = if command.rewrite_channels {
    let channel_stats = rewrite_channels(&mut document);
    if !quiet {
      log_info(colors, &format!("rewrote {} channel reference(s) across {} registered channel(s)", channel_stats.operations_rewritten, channel_stats.channels_registered));
    }
    Some(channel_stats)
  } else {
    None
  };

  let channel_warnings = channel_stats.iter().flat_map(|s| s.warnings());
  for warning in stats.warnings().iter().chain(channel_warnings) {
    log_warn(colors, &warning.to_string());
  }

  let output_path = command.output.clone().unwrap_or_else(|| input_path.clone());
  let rendered = format::serialize(spec_format, &document)?;
  std::fs::write(&output_path, rendered).with_context(|| format!("writing {}", output_path.display()))?;

  if !quiet {
    log_success(
      colors,
      &format!(
        "hoisted {} schema(s), deduplicated {}, normalized {} discriminator(s) -> {}",
        stats.schemas_hoisted,
        stats.schemas_deduplicated,
        stats.discriminators_normalized,
        output_path.display()
      ),
    );
  }

  Ok(())
}
