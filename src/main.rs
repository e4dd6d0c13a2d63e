mod ui;

use clap::Parser;

use ui::{
  cli::{Cli, Commands},
  colors::Colors,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let colors = Colors::resolve(cli.color, cli.theme);

  match cli.command {
    Commands::Normalize(command) => ui::commands::normalize::run(command, &colors, cli.quiet, cli.verbose).await?,
  }

  Ok(())
}
