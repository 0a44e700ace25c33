// SPDX-License-Identifier: GPL-3.0

//! Dispatches a chain's operation map to a [`FetchApi`].

use crate::{
	config::{ScrapeConfig, Selection, is_metadata},
	error::{ConfigError, Error},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumString, VariantArray};

/// The fetches the dispatcher relies on. Each returns the number of newly
/// scraped items.
#[async_trait]
pub trait FetchApi: Send {
	/// Fetches the extrinsics of `module`/`call`, any if `None`.
	async fn fetch_extrinsics_index(
		&mut self,
		module: Option<&str>,
		call: Option<&str>,
		config: &ScrapeConfig,
	) -> Result<u64, Error>;

	/// Fetches the extrinsics with the given ids.
	async fn fetch_extrinsics(&mut self, ids: &[String]) -> Result<u64, Error>;

	/// Fetches the events of `module`/`event`, any if `None`.
	async fn fetch_events_index(
		&mut self,
		module: Option<&str>,
		event: Option<&str>,
		config: &ScrapeConfig,
	) -> Result<u64, Error>;

	/// Fetches the events with the given ids.
	async fn fetch_events(&mut self, ids: &[String]) -> Result<u64, Error>;

	/// Fetches the transfers of an account.
	async fn fetch_transfers(&mut self, account: &str, config: &ScrapeConfig) -> Result<u64, Error>;
}

/// The operations of a chain configuration.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, VariantArray)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
	/// Extrinsics selected by module and call.
	Extrinsics,
	/// Extrinsics selected by id.
	ExtrinsicsList,
	/// Events selected by module and event.
	Events,
	/// Events selected by id.
	EventsList,
	/// Transfers selected by account.
	Transfers,
}

/// The index walked by [`ParachainScraper::scrape_module_calls`].
#[derive(AsRefStr, Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum IndexKind {
	Extrinsics,
	Events,
}

/// Walks the operation map of a single chain, fetching what it selects.
pub struct ParachainScraper<A> {
	api: A,
}

impl<A: FetchApi> ParachainScraper<A> {
	pub fn new(api: A) -> Self {
		Self { api }
	}

	/// Releases the underlying API.
	pub fn into_inner(self) -> A {
		self.api
	}

	/// Runs every operation of `operations`, in configuration order.
	///
	/// Unrecognized operations are logged and skipped. Any other failure
	/// aborts the walk.
	///
	/// # Arguments
	/// * `operations` - The chain's configuration, keyed by operation.
	/// * `chain_config` - The scope of the chain.
	pub async fn scrape(
		&mut self,
		operations: &Map<String, Value>,
		chain_config: &ScrapeConfig,
	) -> Result<u64, Error> {
		let mut items_scraped = 0;
		for (key, value) in operations {
			if is_metadata(key) {
				continue;
			}
			let Ok(operation) = key.parse::<Operation>() else {
				log::error!("Operation not recognized: {key}");
				continue;
			};
			items_scraped += match operation {
				Operation::Extrinsics =>
					self.scrape_module_calls(Some(value), chain_config, IndexKind::Extrinsics)
						.await?,
				Operation::Events =>
					self.scrape_module_calls(Some(value), chain_config, IndexKind::Events).await?,
				Operation::ExtrinsicsList => {
					let ids = id_list(value, operation)?;
					if skipped(chain_config, operation) {
						continue;
					}
					self.api.fetch_extrinsics(&ids).await?
				},
				Operation::EventsList => {
					let ids = id_list(value, operation)?;
					if skipped(chain_config, operation) {
						continue;
					}
					self.api.fetch_events(&ids).await?
				},
				Operation::Transfers => self.scrape_transfers(Some(value), chain_config).await?,
			};
		}
		Ok(items_scraped)
	}

	/// Fetches the index of `kind` for every module/call pair `modules`
	/// selects.
	///
	/// A missing or `null` selection fetches all modules and calls at once.
	/// Modules may select their calls by list, sharing the module's scope,
	/// or by mapping, each call with its own scope.
	pub async fn scrape_module_calls(
		&mut self,
		modules: Option<&Value>,
		chain_config: &ScrapeConfig,
		kind: IndexKind,
	) -> Result<u64, Error> {
		let config = chain_config.create_inner_config(modules.unwrap_or(&Value::Null))?;
		let selection = Selection::parse(modules, kind.as_ref())?;
		if selection == Selection::Unrestricted {
			return self.fetch_index(kind, None, None, &config).await;
		}

		let mut items_scraped = 0;
		for (module, calls) in selection.entries(kind.as_ref())? {
			let path = format!("{kind}.{module}");
			let module_config = match calls {
				Some(calls) => config.create_inner_config(calls)?,
				None => config.clone(),
			};
			let calls = Selection::parse(calls, &path)?;
			if calls == Selection::Unrestricted {
				items_scraped += self.fetch_index(kind, Some(module), None, &module_config).await?;
				continue;
			}
			let calls = calls.entries(&path)?;
			if calls.is_empty() {
				log::debug!("No calls of {path} are selected");
			}
			for (call, call_value) in calls {
				let call_config = match call_value {
					Some(call_value) => module_config.create_inner_config(call_value)?,
					None => module_config.clone(),
				};
				items_scraped += self.fetch_index(kind, Some(module), Some(call), &call_config).await?;
			}
		}
		Ok(items_scraped)
	}

	/// Fetches the transfers of every account `accounts` selects.
	pub async fn scrape_transfers(
		&mut self,
		accounts: Option<&Value>,
		chain_config: &ScrapeConfig,
	) -> Result<u64, Error> {
		let path = Operation::Transfers.as_ref();
		let config = chain_config.create_inner_config(accounts.unwrap_or(&Value::Null))?;
		let selection = Selection::parse(accounts, path)?;
		if selection == Selection::Unrestricted {
			return Err(ConfigError::MissingAccounts.into());
		}

		let mut items_scraped = 0;
		for (account, account_value) in selection.entries(path)? {
			let account_config = match account_value {
				Some(account_value) => config.create_inner_config(account_value)?,
				None => config.clone(),
			};
			if skipped(&account_config, format_args!("transfers of {account}")) {
				continue;
			}
			items_scraped += self.api.fetch_transfers(account, &account_config).await?;
		}
		Ok(items_scraped)
	}

	async fn fetch_index(
		&mut self,
		kind: IndexKind,
		module: Option<&str>,
		call: Option<&str>,
		config: &ScrapeConfig,
	) -> Result<u64, Error> {
		let (module_name, call_name) = (module.unwrap_or("*"), call.unwrap_or("*"));
		if skipped(config, format_args!("{kind} of {module_name}.{call_name}")) {
			return Ok(0);
		}
		match kind {
			IndexKind::Extrinsics => self.api.fetch_extrinsics_index(module, call, config).await,
			IndexKind::Events => self.api.fetch_events_index(module, call, config).await,
		}
	}
}

fn skipped(config: &ScrapeConfig, target: impl fmt::Display) -> bool {
	if config.skip() {
		log::info!("Skipping {target}");
	}
	config.skip()
}

fn id_list(value: &Value, operation: Operation) -> Result<Vec<String>, ConfigError> {
	let invalid =
		|| ConfigError::InvalidShape { path: operation.to_string(), expected: "a list of ids" };
	value
		.as_array()
		.ok_or_else(invalid)?
		.iter()
		.map(|id| id.as_str().map(String::from).ok_or_else(invalid))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ApiError;
	use serde_json::json;
	use strum::VariantArray as _;

	#[derive(Clone, Debug, PartialEq)]
	enum Call {
		ExtrinsicsIndex(Option<String>, Option<String>, ScrapeConfig),
		Extrinsics(Vec<String>),
		EventsIndex(Option<String>, Option<String>, ScrapeConfig),
		Events(Vec<String>),
		Transfers(String, ScrapeConfig),
	}

	/// Records every fetch, reporting one item each.
	#[derive(Default)]
	struct MockApi {
		calls: Vec<Call>,
		fail: bool,
	}

	impl MockApi {
		fn record(&mut self, call: Call) -> Result<u64, Error> {
			self.calls.push(call);
			if self.fail {
				return Err(ApiError::MissingData("mock".into()).into());
			}
			Ok(1)
		}
	}

	#[async_trait]
	impl FetchApi for MockApi {
		async fn fetch_extrinsics_index(
			&mut self,
			module: Option<&str>,
			call: Option<&str>,
			config: &ScrapeConfig,
		) -> Result<u64, Error> {
			self.record(Call::ExtrinsicsIndex(
				module.map(String::from),
				call.map(String::from),
				config.clone(),
			))
		}

		async fn fetch_extrinsics(&mut self, ids: &[String]) -> Result<u64, Error> {
			self.record(Call::Extrinsics(ids.to_vec()))
		}

		async fn fetch_events_index(
			&mut self,
			module: Option<&str>,
			event: Option<&str>,
			config: &ScrapeConfig,
		) -> Result<u64, Error> {
			self.record(Call::EventsIndex(module.map(String::from), event.map(String::from), config.clone()))
		}

		async fn fetch_events(&mut self, ids: &[String]) -> Result<u64, Error> {
			self.record(Call::Events(ids.to_vec()))
		}

		async fn fetch_transfers(&mut self, account: &str, config: &ScrapeConfig) -> Result<u64, Error> {
			self.record(Call::Transfers(account.into(), config.clone()))
		}
	}

	async fn run(chain: Value) -> (Result<u64, Error>, Vec<Call>) {
		let Value::Object(operations) = chain else { panic!("chain configuration must be a map") };
		let chain_config = ScrapeConfig::new(&Value::Object(operations.clone())).unwrap();
		let mut scraper = ParachainScraper::new(MockApi::default());
		let result = scraper.scrape(&operations, &chain_config).await;
		(result, scraper.into_inner().calls)
	}

	fn extrinsics(module: Option<&str>, call: Option<&str>, config: &ScrapeConfig) -> Call {
		Call::ExtrinsicsIndex(module.map(String::from), call.map(String::from), config.clone())
	}

	#[test]
	fn operations_parse_from_kebab_case() {
		let names: Vec<_> = Operation::VARIANTS.iter().map(|op| op.to_string()).collect();
		assert_eq!(names, ["extrinsics", "extrinsics-list", "events", "events-list", "transfers"]);
		assert_eq!("events-list".parse::<Operation>(), Ok(Operation::EventsList));
		assert!("eventslist".parse::<Operation>().is_err());
	}

	#[tokio::test]
	async fn null_modules_fetch_everything_once() {
		let (result, calls) = run(json!({
			"_params": { "block_num": 15228214 },
			"extrinsics": null
		}))
		.await;
		let config = ScrapeConfig::new(&json!({ "_params": { "block_num": 15228214 } })).unwrap();
		assert_eq!(result.unwrap(), 1);
		assert_eq!(calls, vec![extrinsics(None, None, &config)]);
	}

	#[tokio::test]
	async fn listed_calls_share_the_module_scope() {
		let (result, calls) = run(json!({
			"extrinsics": {
				"bounties": {
					"_auto_hydrate": true,
					"_params": { "address": "EGP7" },
					"propose_bounty": null,
					"award_bounty": { "_auto_hydrate": false }
				},
				"treasury": ["propose_spend", "_ignored", "approve_proposal"]
			}
		}))
		.await;
		assert_eq!(result.unwrap(), 4);

		let module = ScrapeConfig::new(&json!({ "_auto_hydrate": true, "_params": { "address": "EGP7" } }))
			.unwrap();
		let award = module.create_inner_config(&json!({ "_auto_hydrate": false })).unwrap();
		let root = ScrapeConfig::default();
		assert_eq!(
			calls,
			vec![
				extrinsics(Some("bounties"), Some("propose_bounty"), &module),
				extrinsics(Some("bounties"), Some("award_bounty"), &award),
				extrinsics(Some("treasury"), Some("propose_spend"), &root),
				extrinsics(Some("treasury"), Some("approve_proposal"), &root),
			]
		);
	}

	#[tokio::test]
	async fn null_module_fetches_all_its_calls() {
		let (result, calls) = run(json!({ "extrinsics": { "bounties": null } })).await;
		assert_eq!(result.unwrap(), 1);
		assert_eq!(calls, vec![extrinsics(Some("bounties"), None, &ScrapeConfig::default())]);

		let (_, calls) = run(json!({ "events": ["balances", "system"] })).await;
		assert_eq!(
			calls,
			vec![
				Call::EventsIndex(Some("balances".into()), None, ScrapeConfig::default()),
				Call::EventsIndex(Some("system".into()), None, ScrapeConfig::default()),
			]
		);
	}

	#[tokio::test]
	async fn metadata_only_modules_select_no_calls() {
		let (result, calls) = run(json!({
			"extrinsics": { "bounties": { "_auto_hydrate": true }, "treasury": null }
		}))
		.await;
		assert_eq!(result.unwrap(), 1);
		assert_eq!(calls, vec![extrinsics(Some("treasury"), None, &ScrapeConfig::default())]);
	}

	#[tokio::test]
	async fn skip_is_honored_at_every_level() {
		let (result, calls) = run(json!({
			"extrinsics": {
				"bounties": { "_skip": true, "propose_bounty": null },
				"treasury": { "propose_spend": { "_skip": true }, "approve_proposal": null }
			},
			"events": { "_skip": true, "system": null }
		}))
		.await;
		assert_eq!(result.unwrap(), 1);
		assert_eq!(
			calls,
			vec![extrinsics(Some("treasury"), Some("approve_proposal"), &ScrapeConfig::default())]
		);

		let (result, calls) =
			run(json!({ "_skip": true, "extrinsics-list": ["1-1"], "transfers": ["EGP7"] })).await;
		assert_eq!(result.unwrap(), 0);
		assert!(calls.is_empty());
	}

	#[tokio::test]
	async fn unrecognized_operations_do_not_abort() {
		let (result, calls) = run(json!({
			"bogus": { "bounties": null },
			"extrinsics-list": ["14238250-2"],
			"_auto_hydrate": true,
			"events-list": ["14238250-5", "14238250-6"]
		}))
		.await;
		assert_eq!(result.unwrap(), 2);
		assert_eq!(
			calls,
			vec![
				Call::Extrinsics(vec!["14238250-2".into()]),
				Call::Events(vec!["14238250-5".into(), "14238250-6".into()]),
			]
		);
	}

	#[tokio::test]
	async fn transfers_walk_accounts() {
		let (result, calls) = run(json!({
			"transfers": {
				"_params": { "direction": "sent" },
				"EGP7": null,
				"F3op": { "_skip": true },
				"HqRc": { "_params": { "direction": "received" } }
			}
		}))
		.await;
		assert_eq!(result.unwrap(), 2);
		let sent = ScrapeConfig::new(&json!({ "_params": { "direction": "sent" } })).unwrap();
		let received = ScrapeConfig::new(&json!({ "_params": { "direction": "received" } })).unwrap();
		assert_eq!(
			calls,
			vec![Call::Transfers("EGP7".into(), sent), Call::Transfers("HqRc".into(), received)]
		);

		let (result, calls) = run(json!({ "transfers": null })).await;
		assert!(matches!(result, Err(Error::Config(ConfigError::MissingAccounts))));
		assert!(calls.is_empty());
	}

	#[tokio::test]
	async fn malformed_selections_are_rejected() {
		let (result, _) = run(json!({ "extrinsics-list": "14238250-2" })).await;
		assert!(matches!(
			result,
			Err(Error::Config(ConfigError::InvalidShape { expected: "a list of ids", .. }))
		));

		let (result, _) = run(json!({ "extrinsics": { "bounties": 7 } })).await;
		assert!(matches!(
			result,
			Err(Error::Config(ConfigError::InvalidShape { ref path, .. })) if path == "extrinsics.bounties"
		));
	}

	#[tokio::test]
	async fn fetch_failures_abort_the_walk() {
		let operations = json!({ "extrinsics": ["bounties", "treasury"] });
		let mut scraper = ParachainScraper::new(MockApi { fail: true, ..Default::default() });
		let result = scraper
			.scrape(operations.as_object().unwrap(), &ScrapeConfig::default())
			.await;
		assert!(matches!(result, Err(Error::Api(ApiError::MissingData(_)))));
		assert_eq!(scraper.into_inner().calls.len(), 1);
	}
}
