// SPDX-License-Identifier: GPL-3.0

//! Subscan request and response payloads.

use crate::{
	db::{Event, Extrinsic, Transfer, encode_json},
	error::CacheError,
};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

/// The envelope wrapping every Subscan response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
	pub code: i64,
	#[serde(default)]
	pub message: String,
	pub data: Option<T>,
}

/// A page of an index endpoint.
pub(crate) trait Page: for<'de> Deserialize<'de> {
	type Item;

	fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtrinsicsPage {
	#[serde(default)]
	extrinsics: Option<Vec<ExtrinsicRecord>>,
}

impl Page for ExtrinsicsPage {
	type Item = ExtrinsicRecord;

	fn into_items(self) -> Vec<ExtrinsicRecord> {
		self.extrinsics.unwrap_or_default()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsPage {
	#[serde(default)]
	events: Option<Vec<EventRecord>>,
}

impl Page for EventsPage {
	type Item = EventRecord;

	fn into_items(self) -> Vec<EventRecord> {
		self.events.unwrap_or_default()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransfersPage {
	#[serde(default)]
	transfers: Option<Vec<TransferRecord>>,
}

impl Page for TransfersPage {
	type Item = TransferRecord;

	fn into_items(self) -> Vec<TransferRecord> {
		self.transfers.unwrap_or_default()
	}
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccountDisplay {
	#[serde(default)]
	pub address: Option<String>,
}

/// An extrinsic, either as index entry or with its details.
///
/// Only the detail endpoint reports `params` and `error`.
#[derive(Debug, Deserialize)]
pub(crate) struct ExtrinsicRecord {
	pub extrinsic_index: String,
	pub block_num: i64,
	pub call_module: String,
	pub call_module_function: String,
	#[serde(default)]
	pub account_id: Option<String>,
	#[serde(default)]
	pub account_display: Option<AccountDisplay>,
	#[serde(default, deserialize_with = "amount")]
	pub nonce: Option<i64>,
	pub extrinsic_hash: String,
	#[serde(default)]
	pub success: bool,
	#[serde(default, deserialize_with = "json_value")]
	pub params: Option<Value>,
	#[serde(default, deserialize_with = "amount")]
	pub fee: Option<i64>,
	#[serde(default, deserialize_with = "amount")]
	pub fee_used: Option<i64>,
	#[serde(default, deserialize_with = "json_value")]
	pub error: Option<Value>,
	#[serde(default)]
	pub finalized: bool,
	#[serde(default, deserialize_with = "amount")]
	pub tip: Option<i64>,
}

impl TryFrom<ExtrinsicRecord> for Extrinsic {
	type Error = CacheError;

	fn try_from(record: ExtrinsicRecord) -> Result<Self, Self::Error> {
		let address = record
			.account_display
			.and_then(|display| display.address)
			.or(record.account_id)
			.filter(|address| !address.is_empty());
		Ok(Extrinsic {
			id: record.extrinsic_index,
			block_number: record.block_num,
			module: record.call_module,
			call: record.call_module_function,
			address,
			nonce: record.nonce,
			extrinsic_hash: record.extrinsic_hash,
			success: record.success,
			params: encode_json(record.params.as_ref())?,
			fee: record.fee,
			fee_used: record.fee_used,
			error: encode_json(record.error.as_ref())?,
			finalized: record.finalized,
			tip: record.tip,
		})
	}
}

/// An event, either as index entry or with its details.
#[derive(Debug, Deserialize)]
pub(crate) struct EventRecord {
	pub event_index: String,
	pub block_num: i64,
	#[serde(default)]
	pub extrinsic_index: Option<String>,
	pub module_id: String,
	pub event_id: String,
	#[serde(default, deserialize_with = "json_value")]
	pub params: Option<Value>,
	#[serde(default)]
	pub finalized: bool,
}

impl TryFrom<EventRecord> for Event {
	type Error = CacheError;

	fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
		Ok(Event {
			id: record.event_index,
			block_number: record.block_num,
			extrinsic_id: record.extrinsic_index.filter(|id| !id.is_empty()),
			module: record.module_id,
			event: record.event_id,
			params: encode_json(record.params.as_ref())?,
			finalized: record.finalized,
		})
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransferRecord {
	#[serde(default)]
	pub event_idx: Option<i64>,
	pub block_num: i64,
	#[serde(default)]
	pub extrinsic_index: Option<String>,
	pub from: String,
	pub to: String,
	#[serde(default)]
	pub amount: Value,
	pub hash: String,
	#[serde(default)]
	pub success: bool,
}

impl From<TransferRecord> for Transfer {
	fn from(record: TransferRecord) -> Self {
		let id = match (&record.extrinsic_index, record.event_idx) {
			(Some(extrinsic), Some(event)) => format!("{extrinsic}-{event}"),
			(Some(extrinsic), None) => extrinsic.clone(),
			_ => record.hash.clone(),
		};
		let amount = match record.amount {
			Value::String(amount) => amount,
			other => other.to_string(),
		};
		Transfer {
			id,
			block_number: record.block_num,
			extrinsic_id: record.extrinsic_index,
			from: record.from,
			to: record.to,
			amount,
			hash: record.hash,
			success: record.success,
		}
	}
}

/// Reads an integer reported either as JSON number or as decimal string.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::Number(number)) => number
			.as_i64()
			.map(Some)
			.ok_or_else(|| D::Error::custom(format!("{number} does not fit an i64"))),
		Some(Value::String(text)) if text.is_empty() => Ok(None),
		Some(Value::String(text)) => text.parse().map(Some).map_err(D::Error::custom),
		Some(other) => Err(D::Error::custom(format!("expected an amount, found {other}"))),
	}
}

/// Reads a JSON value which may arrive double-encoded as a string.
fn json_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
	Ok(match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => None,
		Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
			Ok(value @ (Value::Array(_) | Value::Object(_))) => Some(value),
			_ => Some(Value::String(text)),
		},
		Some(value) => Some(value),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn summary() -> Value {
		json!({
			"block_num": 14061443,
			"block_timestamp": 1661173230,
			"extrinsic_index": "14061443-2",
			"call_module_function": "propose_bounty",
			"call_module": "bounties",
			"nonce": 12,
			"extrinsic_hash": "0x9f2a81d8d92884122d122d806276da7ff9b440a0a273bc3898cbd4072d5f62e1",
			"success": true,
			"fee": "153333331",
			"fee_used": "153333331",
			"tip": "0",
			"finalized": true,
			"account_display": { "address": "EGP7XztdTosm1EmaATZVMjSWujGEj9nNidhjqA2zZtttkFg" }
		})
	}

	#[test]
	fn summary_converts_without_params() {
		let record: ExtrinsicRecord = serde_json::from_value(summary()).unwrap();
		let extrinsic = Extrinsic::try_from(record).unwrap();
		assert_eq!(extrinsic.id, "14061443-2");
		assert_eq!(extrinsic.block_number, 14061443);
		assert_eq!(extrinsic.module, "bounties");
		assert_eq!(extrinsic.call, "propose_bounty");
		assert_eq!(extrinsic.address.as_deref(), Some("EGP7XztdTosm1EmaATZVMjSWujGEj9nNidhjqA2zZtttkFg"));
		assert_eq!(extrinsic.fee, Some(153333331));
		assert_eq!(extrinsic.tip, Some(0));
		assert!(!extrinsic.is_hydrated());
		assert_eq!(extrinsic.error, None);
	}

	#[test]
	fn detail_converts_with_params() {
		let mut detail = summary();
		detail["params"] = json!([{ "name": "value", "type": "Compact<Balance>", "value": "1000" }]);
		detail["error"] = Value::Null;
		detail["fee"] = json!(153333331);
		let extrinsic = Extrinsic::try_from(serde_json::from_value::<ExtrinsicRecord>(detail).unwrap()).unwrap();
		assert!(extrinsic.is_hydrated());
		assert_eq!(
			extrinsic.params_json().unwrap(),
			Some(json!([{ "name": "value", "type": "Compact<Balance>", "value": "1000" }]))
		);
		assert_eq!(extrinsic.fee, Some(153333331));
	}

	#[test]
	fn rejects_malformed_amounts() {
		let mut record = summary();
		record["fee"] = json!("lots");
		assert!(serde_json::from_value::<ExtrinsicRecord>(record).is_err());
	}

	#[test]
	fn decodes_double_encoded_params() {
		let event: EventRecord = serde_json::from_value(json!({
			"event_index": "14238250-5",
			"block_num": 14238250,
			"extrinsic_index": "14238250-2",
			"module_id": "balances",
			"event_id": "Withdraw",
			"params": "[{\"type\":\"AccountId32\",\"value\":\"0x00\"}]",
			"finalized": true
		}))
		.unwrap();
		let event = Event::try_from(event).unwrap();
		assert_eq!(event.params_json().unwrap(), Some(json!([{ "type": "AccountId32", "value": "0x00" }])));
		assert_eq!(event.extrinsic_id.as_deref(), Some("14238250-2"));
	}

	#[test]
	fn missing_page_lists_are_empty() {
		let page: ExtrinsicsPage = serde_json::from_value(json!({ "count": 0, "extrinsics": null })).unwrap();
		assert!(page.into_items().is_empty());
		let page: EventsPage = serde_json::from_value(json!({ "count": 0 })).unwrap();
		assert!(page.into_items().is_empty());
	}

	#[test]
	fn transfer_ids_follow_their_event() {
		let record: TransferRecord = serde_json::from_value(json!({
			"from": "a",
			"to": "b",
			"extrinsic_index": "14238250-2",
			"event_idx": 4,
			"amount": "1.5",
			"block_num": 14238250,
			"hash": "0x408a",
			"success": true
		}))
		.unwrap();
		let transfer = Transfer::from(record);
		assert_eq!(transfer.id, "14238250-2-4");
		assert_eq!(transfer.amount, "1.5");
	}
}
