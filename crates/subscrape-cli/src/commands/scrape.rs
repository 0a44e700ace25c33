// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::*, style::format_path};
use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};
use subscrape::{DEFAULT_ENDPOINT, Settings, scrape, wipe_cache};

/// Scrape configuration used unless another is given.
const DEFAULT_CONFIG: &str = "config/scrape_config.json";

#[derive(Args, Clone, Debug)]
pub(crate) struct ScrapeArgs {
	/// Path to the scrape configuration.
	#[arg(short, long, default_value = DEFAULT_CONFIG)]
	pub(crate) config: PathBuf,
	/// Directory holding the chain caches [default: the platform cache directory].
	#[arg(long)]
	pub(crate) cache: Option<PathBuf>,
	/// The Subscan API key.
	#[arg(long, env = "SUBSCAN_API_KEY", hide_env_values = true)]
	pub(crate) api_key: Option<String>,
	/// The Subscan endpoint, any `{chain}` being replaced by the chain name.
	#[arg(long, default_value = DEFAULT_ENDPOINT)]
	pub(crate) endpoint: String,
	/// Remove all cached chains before scraping.
	#[arg(long)]
	pub(crate) wipe: bool,
}

/// Scrapes the chains of a configuration.
pub(crate) struct ScrapeCommand<'a, CLI: Cli> {
	/// The cli to be used.
	pub(crate) cli: &'a mut CLI,
	/// The arguments of the scrape.
	pub(crate) args: ScrapeArgs,
	/// The cache to be used.
	pub(crate) cache: PathBuf,
}

impl<CLI: Cli> ScrapeCommand<'_, CLI> {
	/// Executes the command, returning the number of newly scraped items.
	pub(crate) async fn execute(self) -> Result<u64> {
		self.cli.intro("Scrape chains from Subscan")?;

		let config = match read_config(&self.args.config) {
			Ok(config) => config,
			Err(e) => {
				self.cli.outro_cancel(format!("🚫 {e:#}"))?;
				return Err(e);
			},
		};

		if self.args.wipe {
			wipe_cache(&self.cache)?;
			self.cli.warning(format!("The cache at {} was wiped.", format_path(&self.cache)))?;
		}
		self.cli.info(format!("ℹ️ The cache is located at {}", format_path(&self.cache)))?;

		let settings = Settings {
			api_key: self.args.api_key.clone(),
			endpoint: self.args.endpoint.clone(),
			..Settings::new(&self.cache)
		};
		let spinner = self.cli.spinner();
		spinner.start("Scraping...");
		match scrape(&config, &settings).await {
			Ok(items) => {
				spinner.stop("Scrape complete");
				self.cli.success(format!("Scraped {items} new items"))?;
				self.cli.outro("✅ Done")?;
				Ok(items)
			},
			Err(e) => {
				spinner.error("Scrape failed");
				self.cli.error(&e)?;
				self.cli.outro_cancel("🚫 The scrape was aborted.")?;
				Err(e.into())
			},
		}
	}
}

/// Reads a JSON scrape configuration.
fn read_config(path: &Path) -> Result<Value> {
	let contents = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read {}", path.display()))?;
	serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
