// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::*, style::format_path};
use anyhow::Result;
use clap::Args;
use std::{fs::remove_file, path::PathBuf};
use subscrape::cached_chains;

#[derive(Args)]
pub(crate) struct CleanArgs {
	/// Directory holding the chain caches [default: the platform cache directory].
	#[arg(long)]
	pub(crate) cache: Option<PathBuf>,
	/// Remove every cached chain without prompting.
	#[arg(short, long)]
	pub(crate) all: bool,
}

/// Removes cached chains.
pub(crate) struct CleanCacheCommand<'a, CLI: Cli> {
	/// The cli to be used.
	pub(crate) cli: &'a mut CLI,
	/// The cache to be used.
	pub(crate) cache: PathBuf,
	/// Whether to remove everything without prompting.
	pub(crate) all: bool,
}

impl<CLI: Cli> CleanCacheCommand<'_, CLI> {
	/// Executes the command.
	pub(crate) fn execute(self) -> Result<()> {
		self.cli.intro("Remove cached chains")?;

		if !self.cache.exists() {
			self.cli.outro_cancel("🚫 The cache does not exist.")?;
			return Ok(());
		};
		let caches = cached_chains(&self.cache)?;
		if caches.is_empty() {
			self.cli.outro(format!("ℹ️ The cache at {} is empty.", format_path(&self.cache)))?;
			return Ok(());
		}
		self.cli.info(format!("ℹ️ The cache is located at {}", format_path(&self.cache)))?;

		let selected = if self.all {
			caches
		} else {
			// Prompt for selection of chains to be removed
			let selected = {
				let mut prompt =
					self.cli.multiselect("Select the chains you wish to remove:").required(false);
				for path in &caches {
					let size = path.metadata().map(|m| m.len()).unwrap_or_default();
					prompt = prompt.item(path.clone(), chain(path), format!("{}MiB", size / 1_048_576))
				}
				prompt.interact()?
			};
			if selected.is_empty() {
				self.cli.outro("ℹ️ No chains removed")?;
				return Ok(());
			};

			let prompt = match selected.len() {
				1 => "Are you sure you want to remove the selected chain?".into(),
				_ => format!("Are you sure you want to remove the {} selected chains?", selected.len()),
			};
			if !self.cli.confirm(prompt).initial_value(false).interact()? {
				self.cli.outro("ℹ️ No chains removed")?;
				return Ok(());
			}
			selected
		};

		for file in &selected {
			remove_file(file)?
		}
		self.cli.outro(format!("ℹ️ {} chains removed", selected.len()))?;
		Ok(())
	}
}

/// The chain a cache belongs to.
fn chain(path: &std::path::Path) -> String {
	path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}
