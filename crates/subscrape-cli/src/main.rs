// SPDX-License-Identifier: GPL-3.0

mod cli;
mod commands;
mod style;

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, styles=style::get_styles())]
pub struct Cli {
	#[command(subcommand)]
	command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
	env_logger::init();
	let cli = Cli::parse();
	cli.command.execute().await
}

/// The default cache directory.
fn cache() -> Result<PathBuf> {
	Ok(dirs::cache_dir()
		.ok_or(anyhow!("the cache directory could not be determined"))?
		.join("subscrape"))
}

#[test]
fn verify_cli() {
	// https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_4/index.html
	use clap::CommandFactory;
	Cli::command().debug_assert()
}

#[test]
fn scrape_flags_parse() {
	let cli = Cli::try_parse_from(["subscrape", "scrape", "--wipe", "--config", "kusama.json"])
		.expect("scrape flags must parse");
	let commands::Command::Scrape(args) = cli.command else { panic!("expected scrape") };
	assert!(args.wipe);
	assert_eq!(args.config, PathBuf::from("kusama.json"));
	// Requests are issued one at a time
	assert!(Cli::try_parse_from(["subscrape", "scrape", "--max-concurrent", "4"]).is_err());
}
