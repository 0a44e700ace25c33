// SPDX-License-Identifier: GPL-3.0

use crate::{cache, cli::Cli};
use clap::Subcommand;

pub(crate) mod clean;
pub(crate) mod scrape;

#[derive(Subcommand)]
#[command(subcommand_required = true)]
pub(crate) enum Command {
	/// Scrape the chains of a configuration into the cache.
	#[clap(alias = "s")]
	Scrape(scrape::ScrapeArgs),
	/// Remove cached chains.
	#[clap(alias = "C")]
	Clean(clean::CleanArgs),
}

impl Command {
	/// Executes the command.
	pub(crate) async fn execute(self) -> anyhow::Result<()> {
		match self {
			Self::Scrape(args) => {
				let cache = match args.cache.clone() {
					Some(cache) => cache,
					None => cache()?,
				};
				scrape::ScrapeCommand { cli: &mut Cli, args, cache }.execute().await.map(|_| ())
			},
			Self::Clean(args) => {
				let cache = match args.cache {
					Some(cache) => cache,
					None => cache()?,
				};
				clean::CleanCacheCommand { cli: &mut Cli, cache, all: args.all }.execute()
			},
		}
	}
}
