// SPDX-License-Identifier: GPL-3.0

use super::{
	ApiClient,
	types::{
		Envelope, EventRecord, EventsPage, ExtrinsicRecord, ExtrinsicsPage, Page, TransfersPage,
	},
};
use crate::{
	config::ScrapeConfig,
	db::{Event, Extrinsic, SubscrapeDb, Transfer},
	error::{ApiError, Error},
	scraper::FetchApi,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

/// Paged extrinsics, filterable by module, call and any forwarded parameter.
const EXTRINSICS_INDEX: &str = "api/v2/scan/extrinsics";
/// The details of a single extrinsic.
const EXTRINSIC_DETAIL: &str = "api/scan/extrinsic";
/// Paged events, filterable by module, event and any forwarded parameter.
const EVENTS_INDEX: &str = "api/v2/scan/events";
/// The details of a single event.
const EVENT_DETAIL: &str = "api/scan/event";
/// Paged transfers of an account.
const TRANSFERS_INDEX: &str = "api/v2/scan/transfers";

/// Requests in flight at once.
const MAX_CONCURRENT_REQUESTS: usize = 1;

/// The HTTP side of [`SubscanApi`].
struct Subscan {
	client: ApiClient,
	endpoint: Url,
}

impl Subscan {
	/// Posts `body` to `path` and unwraps the Subscan envelope.
	async fn query<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
		let envelope: Envelope<T> = self.client.post(self.endpoint.join(path)?, body).await?.json()?;
		if envelope.code != 0 {
			return Err(ApiError::SubscanError { code: envelope.code, message: envelope.message });
		}
		envelope.data.ok_or_else(|| ApiError::MissingData(path.into()))
	}

	/// Fetches one page of an index endpoint.
	async fn page<P: Page>(
		&self,
		path: &str,
		filter: &Map<String, Value>,
		page: u32,
		row: u32,
	) -> Result<Vec<P::Item>, ApiError> {
		let mut body = filter.clone();
		body.insert("page".into(), json!(page));
		body.insert("row".into(), json!(row));
		Ok(self.query::<P>(path, &Value::Object(body)).await?.into_items())
	}

	async fn extrinsic(&self, id: &str) -> Result<ExtrinsicRecord, ApiError> {
		self.query(EXTRINSIC_DETAIL, &json!({ "extrinsic_index": id })).await
	}

	async fn event(&self, id: &str) -> Result<EventRecord, ApiError> {
		self.query(EVENT_DETAIL, &json!({ "event_index": id })).await
	}
}

/// Fetches chain data from Subscan into a [`SubscrapeDb`].
///
/// Every fetch flushes the cache after each page, so an interrupted scrape
/// keeps what it already received.
pub struct SubscanApi<'a> {
	subscan: Subscan,
	db: &'a mut SubscrapeDb,
}

impl<'a> SubscanApi<'a> {
	/// Creates an API for the chain served at `endpoint`, e.g.
	/// `https://kusama.api.subscan.io/`.
	pub fn new(
		endpoint: Url,
		api_key: Option<String>,
		db: &'a mut SubscrapeDb,
	) -> Result<Self, ApiError> {
		Self::with_concurrency(endpoint, api_key, MAX_CONCURRENT_REQUESTS, db)
	}

	/// Creates an API allowing up to `max_concurrent` requests in flight.
	pub fn with_concurrency(
		mut endpoint: Url,
		api_key: Option<String>,
		max_concurrent: usize,
		db: &'a mut SubscrapeDb,
	) -> Result<Self, ApiError> {
		// Relative paths only join onto a directory
		if !endpoint.path().ends_with('/') {
			let path = format!("{}/", endpoint.path());
			endpoint.set_path(&path);
		}
		let client = ApiClient::new(max_concurrent.max(1), api_key)?;
		Ok(Self { subscan: Subscan { client, endpoint }, db })
	}

	/// Stages an extrinsic along with its block.
	fn stage_extrinsic(&mut self, record: ExtrinsicRecord) -> Result<(), Error> {
		let extrinsic = Extrinsic::try_from(record)?;
		self.db.ensure_block(extrinsic.block_number)?;
		self.db.write(extrinsic);
		Ok(())
	}

	/// Stages an event along with its block.
	fn stage_event(&mut self, record: EventRecord) -> Result<(), Error> {
		let event = Event::try_from(record)?;
		self.db.ensure_block(event.block_number)?;
		self.db.write(event);
		Ok(())
	}
}

/// Builds the filter of an index request from the scope's parameters.
fn index_filter(config: &ScrapeConfig, restrictions: &[(&str, Option<&str>)]) -> Map<String, Value> {
	let mut filter = config.params().clone();
	for (key, value) in restrictions {
		if let Some(value) = value {
			filter.insert((*key).into(), json!(value));
		}
	}
	filter
}

#[async_trait]
impl FetchApi for SubscanApi<'_> {
	async fn fetch_extrinsics_index(
		&mut self,
		module: Option<&str>,
		call: Option<&str>,
		config: &ScrapeConfig,
	) -> Result<u64, Error> {
		let filter = index_filter(config, &[("module", module), ("call", call)]);
		let row = config.page_size();
		let mut items_scraped = 0;
		let mut page = 0;
		loop {
			let items =
				self.subscan.page::<ExtrinsicsPage>(EXTRINSICS_INDEX, &filter, page, row).await?;
			let exhausted = items.len() < row as usize;
			for item in items {
				if self.db.has_extrinsic(&item.extrinsic_index)? {
					continue;
				}
				let record = if config.auto_hydrate() {
					self.subscan.extrinsic(&item.extrinsic_index).await?
				} else {
					item
				};
				self.stage_extrinsic(record)?;
				items_scraped += 1;
			}
			self.db.flush()?;
			if exhausted {
				break;
			}
			page += 1;
		}
		log::info!(
			"Scraped {items_scraped} extrinsics of {}.{}",
			module.unwrap_or("*"),
			call.unwrap_or("*")
		);
		Ok(items_scraped)
	}

	async fn fetch_extrinsics(&mut self, ids: &[String]) -> Result<u64, Error> {
		let mut items_scraped = 0;
		for id in ids {
			if self.db.has_extrinsic(id)? {
				log::debug!("Extrinsic {id} is already cached");
				continue;
			}
			let record = self.subscan.extrinsic(id).await?;
			self.stage_extrinsic(record)?;
			items_scraped += 1;
		}
		self.db.flush()?;
		Ok(items_scraped)
	}

	async fn fetch_events_index(
		&mut self,
		module: Option<&str>,
		event: Option<&str>,
		config: &ScrapeConfig,
	) -> Result<u64, Error> {
		let filter = index_filter(config, &[("module", module), ("event_id", event)]);
		let row = config.page_size();
		let mut items_scraped = 0;
		let mut page = 0;
		loop {
			let items =
				self.subscan.page::<EventsPage>(EVENTS_INDEX, &filter, page, row).await?;
			let exhausted = items.len() < row as usize;
			for item in items {
				if self.db.has_event(&item.event_index)? {
					continue;
				}
				let record = if config.auto_hydrate() {
					self.subscan.event(&item.event_index).await?
				} else {
					item
				};
				self.stage_event(record)?;
				items_scraped += 1;
			}
			self.db.flush()?;
			if exhausted {
				break;
			}
			page += 1;
		}
		log::info!(
			"Scraped {items_scraped} events of {}.{}",
			module.unwrap_or("*"),
			event.unwrap_or("*")
		);
		Ok(items_scraped)
	}

	async fn fetch_events(&mut self, ids: &[String]) -> Result<u64, Error> {
		// Pending writes must be visible to the lookup
		self.db.flush()?;
		let missing = self.db.missing_ids(ids)?;
		log::debug!("{} of {} events are not cached yet", missing.len(), ids.len());
		let mut items_scraped = 0;
		for id in &missing {
			// Listed twice, already staged
			if self.db.has_event(id)? {
				continue;
			}
			let record = self.subscan.event(id).await?;
			self.stage_event(record)?;
			items_scraped += 1;
		}
		self.db.flush()?;
		Ok(items_scraped)
	}

	async fn fetch_transfers(&mut self, account: &str, config: &ScrapeConfig) -> Result<u64, Error> {
		let filter = index_filter(config, &[("address", Some(account))]);
		let row = config.page_size();
		let mut items_scraped = 0;
		let mut page = 0;
		loop {
			let items =
				self.subscan.page::<TransfersPage>(TRANSFERS_INDEX, &filter, page, row).await?;
			let exhausted = items.len() < row as usize;
			for item in items {
				if self.db.write_transfer(&Transfer::from(item))? {
					items_scraped += 1;
				}
			}
			if exhausted {
				break;
			}
			page += 1;
		}
		Ok(items_scraped)
	}
}
