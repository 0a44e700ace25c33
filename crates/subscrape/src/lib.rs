// SPDX-License-Identifier: GPL-3.0

//! Scrapes extrinsics, events and transfers of Substrate chains from Subscan
//! into a local SQLite cache.
//!
//! A scrape is driven by a JSON configuration keyed by chain, then operation:
//!
//! ```json
//! {
//!   "kusama": {
//!     "_auto_hydrate": true,
//!     "extrinsics": { "bounties": ["propose_bounty"] },
//!     "extrinsics-list": ["14238250-2"],
//!     "events": { "system": null },
//!     "events-list": ["14238250-5"]
//!   }
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐     ┌─────────────┐
//! │   scrape()   │────▶│ ParachainScraper  │────▶│  SubscanApi  │────▶│ SubscrapeDb │
//! │ (per chain)  │     │ (operation walk)  │     │ (HTTP, pages)│     │  (SQLite)   │
//! └──────────────┘     └───────────────────┘     └──────────────┘     └─────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod scraper;

pub use api::SubscanApi;
pub use config::ScrapeConfig;
pub use db::SubscrapeDb;
pub use error::{ApiError, CacheError, ConfigError, Error};
pub use scraper::{FetchApi, Operation, ParachainScraper};

use config::is_metadata;
use serde_json::Value;
use std::path::{Path, PathBuf};
use url::Url;

/// The Subscan endpoint of a chain, `{chain}` being replaced by its name.
pub const DEFAULT_ENDPOINT: &str = "https://{chain}.api.subscan.io/";
/// Placeholder for the chain name within an endpoint.
const CHAIN_PLACEHOLDER: &str = "{chain}";
/// File extension of chain caches.
const CACHE_EXTENSION: &str = "db";

/// Runtime settings of a scrape.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
	/// Directory holding one cache per chain.
	pub cache_dir: PathBuf,
	/// The Subscan API key, if any.
	pub api_key: Option<String>,
	/// The Subscan endpoint, see [`DEFAULT_ENDPOINT`].
	pub endpoint: String,
	/// The maximum number of requests in flight.
	pub max_concurrent: usize,
}

impl Settings {
	/// Settings caching into `cache_dir`, querying Subscan without a key.
	pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
		Self {
			cache_dir: cache_dir.into(),
			api_key: None,
			endpoint: DEFAULT_ENDPOINT.into(),
			max_concurrent: 1,
		}
	}

	/// The endpoint serving `chain`.
	pub fn endpoint(&self, chain: &str) -> Result<Url, ApiError> {
		Ok(Url::parse(&self.endpoint.replace(CHAIN_PLACEHOLDER, chain))?)
	}

	/// The cache file of `chain`.
	pub fn cache_path(&self, chain: &str) -> PathBuf {
		self.cache_dir.join(format!("{chain}.{CACHE_EXTENSION}"))
	}
}

/// Scrapes every chain of `config`, returning the number of new items.
///
/// Top-level metadata keys apply to all chains. Each chain is cached in its
/// own database below [`Settings::cache_dir`].
///
/// # Arguments
/// * `config` - The scrape configuration, keyed by chain.
/// * `settings` - Where to cache and how to reach Subscan.
pub async fn scrape(config: &Value, settings: &Settings) -> Result<u64, Error> {
	let Value::Object(chains) = config else {
		return Err(ConfigError::InvalidShape { path: "/".into(), expected: "a mapping of chains" }
			.into());
	};
	let root = ScrapeConfig::new(config)?;

	let mut items_scraped = 0;
	for (chain, chain_value) in chains {
		if is_metadata(chain) {
			continue;
		}
		let Value::Object(operations) = chain_value else {
			return Err(ConfigError::InvalidShape {
				path: chain.clone(),
				expected: "a mapping of operations",
			}
			.into());
		};
		let chain_config = root.create_inner_config(chain_value)?;
		if chain_config.skip() {
			log::info!("Skipping {chain}");
			continue;
		}

		let endpoint = settings.endpoint(chain)?;
		let mut db = SubscrapeDb::open(&settings.cache_path(chain))?;
		let api = SubscanApi::with_concurrency(
			endpoint,
			settings.api_key.clone(),
			settings.max_concurrent,
			&mut db,
		)?;
		let items = ParachainScraper::new(api).scrape(operations, &chain_config).await?;
		db.flush()?;
		db.close();

		log::info!("Scraped {items} items of {chain}");
		items_scraped += items;
	}
	Ok(items_scraped)
}

/// Lists the chain caches within `cache_dir`, sorted by name.
pub fn cached_chains(cache_dir: &Path) -> Result<Vec<PathBuf>, Error> {
	if !cache_dir.exists() {
		return Ok(vec![]);
	}
	let mut caches = Vec::new();
	for entry in std::fs::read_dir(cache_dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
			caches.push(path);
		}
	}
	caches.sort();
	Ok(caches)
}

/// Removes every cache within `cache_dir`.
pub fn wipe_cache(cache_dir: &Path) -> Result<(), Error> {
	if cache_dir.exists() {
		log::info!("Wiping cache at {}", cache_dir.display());
		std::fs::remove_dir_all(cache_dir)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tempfile::tempdir;

	#[test]
	fn endpoints_are_per_chain() {
		let settings = Settings::new("cache");
		assert_eq!(settings.endpoint("kusama").unwrap().as_str(), "https://kusama.api.subscan.io/");
		let settings = Settings { endpoint: "http://localhost:8080".into(), ..settings };
		assert_eq!(settings.endpoint("kusama").unwrap().as_str(), "http://localhost:8080/");
		let settings = Settings { endpoint: "not a url".into(), ..settings };
		assert!(matches!(settings.endpoint("kusama"), Err(ApiError::UrlError(_))));
	}

	#[test]
	fn caches_are_per_chain() {
		let settings = Settings::new("/tmp/subscrape");
		assert_eq!(settings.cache_path("kusama"), PathBuf::from("/tmp/subscrape/kusama.db"));
		assert_eq!(
			settings.cache_path("assethub.polkadot"),
			PathBuf::from("/tmp/subscrape/assethub.polkadot.db")
		);
	}

	#[test]
	fn lists_and_wipes_caches() -> Result<(), Box<dyn std::error::Error>> {
		let temp = tempdir()?;
		let dir = temp.path().join("cache");
		assert!(cached_chains(&dir)?.is_empty());

		let settings = Settings::new(&dir);
		SubscrapeDb::open(&settings.cache_path("moonriver"))?.close();
		SubscrapeDb::open(&settings.cache_path("kusama"))?.close();
		std::fs::write(dir.join("notes.txt"), "")?;
		assert_eq!(cached_chains(&dir)?, vec![dir.join("kusama.db"), dir.join("moonriver.db")]);

		wipe_cache(&dir)?;
		assert!(!dir.exists());
		// Wiping twice is fine
		wipe_cache(&dir)?;
		Ok(())
	}

	#[tokio::test]
	async fn skipped_chains_are_not_opened() -> Result<(), Box<dyn std::error::Error>> {
		let temp = tempdir()?;
		let settings = Settings::new(temp.path());
		let config = json!({ "kusama": { "_skip": true, "extrinsics": null } });
		assert_eq!(scrape(&config, &settings).await?, 0);
		assert!(cached_chains(temp.path())?.is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn rejects_malformed_chains() {
		let settings = Settings::new("unused");
		assert!(matches!(
			scrape(&json!(["kusama"]), &settings).await,
			Err(Error::Config(ConfigError::InvalidShape { .. }))
		));
		assert!(matches!(
			scrape(&json!({ "kusama": ["extrinsics"] }), &settings).await,
			Err(Error::Config(ConfigError::InvalidShape { ref path, .. })) if path == "kusama"
		));
	}
}
