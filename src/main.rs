mod app;
mod commands;
mod dashboard;
mod event;
mod format;
mod logging;

use clap::Parser;
use color_eyre::Result;

use commands::Args;
use tripdeck::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
