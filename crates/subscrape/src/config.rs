// SPDX-License-Identifier: GPL-3.0

//! Scoped views over the nested scrape configuration.
//!
//! A scrape configuration is a JSON tree keyed by chain, then operation, then
//! module/call or account. Keys starting with `_` carry metadata which is
//! inherited by every node below the one declaring it:
//!
//! ```json
//! {
//!   "kusama": {
//!     "_auto_hydrate": false,
//!     "_params": { "block_num": 15228214 },
//!     "extrinsics": {
//!       "bounties": ["propose_bounty"],
//!       "treasury": { "_skip": true }
//!     }
//!   }
//! }
//! ```

use crate::error::ConfigError;
use serde_json::{Map, Value};

/// Prefix marking metadata keys.
pub const METADATA_PREFIX: char = '_';
/// Marks a node (and everything below it) as skipped.
pub const SKIP: &str = "_skip";
/// Whether index entries are replaced by their full details.
pub const AUTO_HYDRATE: &str = "_auto_hydrate";
/// Parameters forwarded verbatim to the API.
pub const PARAMS: &str = "_params";
/// Rows requested per API page.
pub const PAGE_SIZE: &str = "_page_size";

/// Rows requested per API page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// The largest page Subscan serves.
const MAX_PAGE_SIZE: u64 = 100;

/// Returns whether a configuration key is metadata rather than a name.
pub fn is_metadata(key: &str) -> bool {
	key.starts_with(METADATA_PREFIX)
}

/// The configuration in effect at one node of the configuration tree.
///
/// Scopes are immutable: narrowing to a subtree with
/// [`create_inner_config`](Self::create_inner_config) returns a new scope.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeConfig {
	skip: bool,
	auto_hydrate: bool,
	page_size: u32,
	params: Map<String, Value>,
}

impl Default for ScrapeConfig {
	fn default() -> Self {
		Self { skip: false, auto_hydrate: false, page_size: DEFAULT_PAGE_SIZE, params: Map::new() }
	}
}

impl ScrapeConfig {
	/// Creates the root scope of a configuration tree.
	pub fn new(config: &Value) -> Result<Self, ConfigError> {
		Self::default().create_inner_config(config)
	}

	/// Returns the scope governing `subtree`.
	///
	/// The skip flag is or-ed with any `_skip` marker of the subtree, while
	/// `_auto_hydrate`, `_page_size` and the keys of `_params` override the
	/// inherited values. Subtrees which are not mappings inherit everything.
	pub fn create_inner_config(&self, subtree: &Value) -> Result<Self, ConfigError> {
		let mut inner = self.clone();
		let Value::Object(map) = subtree else {
			return Ok(inner);
		};

		if let Some(skip) = map.get(SKIP) {
			inner.skip |= expect_bool(SKIP, skip)?;
		}
		if let Some(auto_hydrate) = map.get(AUTO_HYDRATE) {
			inner.auto_hydrate = expect_bool(AUTO_HYDRATE, auto_hydrate)?;
		}
		if let Some(page_size) = map.get(PAGE_SIZE) {
			inner.page_size = page_size
				.as_u64()
				.filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
				.map(|size| size as u32)
				.ok_or_else(|| ConfigError::OutOfRange {
					key: PAGE_SIZE,
					value: page_size.to_string(),
				})?;
		}
		match map.get(PARAMS) {
			None | Some(Value::Null) => {},
			Some(Value::Object(params)) =>
				for (key, value) in params {
					inner.params.insert(key.clone(), value.clone());
				},
			Some(_) =>
				return Err(ConfigError::InvalidShape { path: PARAMS.into(), expected: "a mapping" }),
		}
		Ok(inner)
	}

	/// Whether this node, or any of its ancestors, is marked as skipped.
	pub fn skip(&self) -> bool {
		self.skip
	}

	/// Whether index entries should be hydrated with their full details.
	pub fn auto_hydrate(&self) -> bool {
		self.auto_hydrate
	}

	/// The number of rows to request per API page.
	pub fn page_size(&self) -> u32 {
		self.page_size
	}

	/// Parameters forwarded to the API, e.g. `block_num` or `address`.
	pub fn params(&self) -> &Map<String, Value> {
		&self.params
	}
}

fn expect_bool(key: &'static str, value: &Value) -> Result<bool, ConfigError> {
	value
		.as_bool()
		.ok_or_else(|| ConfigError::InvalidShape { path: key.into(), expected: "a boolean" })
}

/// One level of the configuration tree, read by shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection<'a> {
	/// No restriction: everything at this level.
	Unrestricted,
	/// A list of names without further configuration.
	Names(&'a [Value]),
	/// Names mapped to their own sub-configuration.
	Configured(&'a Map<String, Value>),
}

impl<'a> Selection<'a> {
	/// Reads the node at `path`.
	pub fn parse(value: Option<&'a Value>, path: &str) -> Result<Self, ConfigError> {
		match value {
			None | Some(Value::Null) => Ok(Self::Unrestricted),
			Some(Value::Array(names)) => Ok(Self::Names(names)),
			Some(Value::Object(map)) => Ok(Self::Configured(map)),
			Some(_) => Err(ConfigError::InvalidShape {
				path: path.into(),
				expected: "null, a list of names or a mapping",
			}),
		}
	}

	/// The selected names, in configuration order, with their sub-configuration.
	///
	/// Metadata keys are never returned, so a mapping holding only metadata
	/// selects nothing. Names of a list carry no sub-configuration.
	pub fn entries(&self, path: &str) -> Result<Vec<(&'a str, Option<&'a Value>)>, ConfigError> {
		match *self {
			Self::Unrestricted => Ok(vec![]),
			Self::Names(names) => names
				.iter()
				.map(|name| {
					name.as_str().map(|name| (name, None)).ok_or_else(|| {
						ConfigError::InvalidShape { path: path.into(), expected: "a list of names" }
					})
				})
				.filter(|entry| !matches!(entry, Ok((name, _)) if is_metadata(name)))
				.collect(),
			Self::Configured(map) => Ok(map
				.iter()
				.filter(|(name, _)| !is_metadata(name))
				.map(|(name, value)| (name.as_str(), Some(value)))
				.collect()),
		}
	}
}
