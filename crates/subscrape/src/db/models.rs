// SPDX-License-Identifier: GPL-3.0

use super::schema::{blocks, events, extrinsics};
use crate::error::CacheError;
use diesel::{Insertable, Queryable, Selectable};
use serde_json::Value;

/// A block, the anchor of the extrinsics and events it contains.
#[derive(Insertable, Queryable, Selectable, Clone, Debug, PartialEq)]
#[diesel(table_name = blocks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Block {
	pub block_number: i64,
}

/// An extrinsic, identified by `<block_number>-<index>`.
///
/// `params` and `error` hold JSON; `params` is only present once the
/// extrinsic has been hydrated with its details.
#[derive(Insertable, Queryable, Selectable, Clone, Debug, PartialEq)]
#[diesel(table_name = extrinsics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Extrinsic {
	pub id: String,
	pub block_number: i64,
	pub module: String,
	pub call: String,
	pub address: Option<String>,
	pub nonce: Option<i64>,
	pub extrinsic_hash: String,
	pub success: bool,
	pub params: Option<String>,
	pub fee: Option<i64>,
	pub fee_used: Option<i64>,
	pub error: Option<String>,
	pub finalized: bool,
	pub tip: Option<i64>,
}

impl Extrinsic {
	/// Whether the extrinsic carries its full details.
	pub fn is_hydrated(&self) -> bool {
		self.params.is_some()
	}

	/// Decodes the call parameters.
	pub fn params_json(&self) -> Result<Option<Value>, CacheError> {
		decode(self.params.as_deref())
	}

	/// Decodes the dispatch error, if any.
	pub fn error_json(&self) -> Result<Option<Value>, CacheError> {
		decode(self.error.as_deref())
	}
}

/// An event, identified by `<block_number>-<index>`.
#[derive(Insertable, Queryable, Selectable, Clone, Debug, PartialEq)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Event {
	pub id: String,
	pub block_number: i64,
	pub extrinsic_id: Option<String>,
	pub module: String,
	pub event: String,
	pub params: Option<String>,
	pub finalized: bool,
}

impl Event {
	/// Decodes the event parameters.
	pub fn params_json(&self) -> Result<Option<Value>, CacheError> {
		decode(self.params.as_deref())
	}
}

/// A transfer as reported by the API. Transfers are not cached yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
	pub id: String,
	pub block_number: i64,
	pub extrinsic_id: Option<String>,
	pub from: String,
	pub to: String,
	pub amount: String,
	pub hash: String,
	pub success: bool,
}

/// Anything that can be staged for writing.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
	Block(Block),
	Extrinsic(Extrinsic),
	Event(Event),
}

impl From<Block> for Record {
	fn from(block: Block) -> Self {
		Record::Block(block)
	}
}

impl From<Extrinsic> for Record {
	fn from(extrinsic: Extrinsic) -> Self {
		Record::Extrinsic(extrinsic)
	}
}

impl From<Event> for Record {
	fn from(event: Event) -> Self {
		Record::Event(event)
	}
}

/// Encodes a JSON column, keeping `null` as SQL `NULL`.
pub(crate) fn encode(value: Option<&Value>) -> Result<Option<String>, CacheError> {
	match value {
		None | Some(Value::Null) => Ok(None),
		Some(value) => Ok(Some(serde_json::to_string(value)?)),
	}
}

fn decode(value: Option<&str>) -> Result<Option<Value>, CacheError> {
	value.map(serde_json::from_str).transpose().map_err(Into::into)
}
