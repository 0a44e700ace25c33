// SPDX-License-Identifier: GPL-3.0

//! SQLite-based cache for scraped chain data.
//!
//! Scrapers stage records with [`SubscrapeDb::write`] while they receive them
//! and commit them in one transaction with [`SubscrapeDb::flush`]. Reads only
//! observe committed records.

mod models;
mod schema;

pub use models::{Block, Event, Extrinsic, Record, Transfer};
pub(crate) use models::encode as encode_json;

use crate::error::CacheError;
use diesel::{connection::SimpleConnection, prelude::*};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use schema::{blocks, events, extrinsics};
use std::{collections::HashSet, path::Path};

/// Migrations creating the cache tables.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// SQLite connection string for in-memory databases.
const SQLITE_MEMORY_URL: &str = ":memory:";

/// SQLite-backed cache of blocks, extrinsics and events.
pub struct SubscrapeDb {
	conn: SqliteConnection,
	pending: Vec<Record>,
}

impl SubscrapeDb {
	/// Open or create a cache database at the specified path.
	///
	/// Creates the parent directory if it doesn't exist.
	pub fn open(path: &Path) -> Result<Self, CacheError> {
		// Ensure parent directory exists
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let url = path
			.to_str()
			.ok_or_else(|| CacheError::DataCorruption(format!("invalid path {}", path.display())))?;
		Self::setup(SqliteConnection::establish(url)?)
	}

	/// Open a private in-memory cache.
	pub fn in_memory() -> Result<Self, CacheError> {
		Self::setup(SqliteConnection::establish(SQLITE_MEMORY_URL)?)
	}

	fn setup(mut conn: SqliteConnection) -> Result<Self, CacheError> {
		conn.batch_execute("PRAGMA foreign_keys = ON;")?;
		conn.run_pending_migrations(MIGRATIONS)?;
		Ok(Self { conn, pending: Vec::new() })
	}

	/// Stages a record for writing. Nothing is committed until [`Self::flush`].
	pub fn write(&mut self, record: impl Into<Record>) {
		self.pending.push(record.into());
	}

	/// The number of staged records.
	pub fn pending(&self) -> usize {
		self.pending.len()
	}

	/// Commits all staged records in one transaction, returning how many were
	/// written.
	///
	/// If any record fails to insert, none are, and the staged batch is
	/// discarded. Inserting an existing primary key fails with
	/// [`CacheError::UniqueConstraintViolation`].
	pub fn flush(&mut self) -> Result<usize, CacheError> {
		let pending = std::mem::take(&mut self.pending);
		if pending.is_empty() {
			return Ok(0);
		}

		self.conn.transaction::<_, CacheError, _>(|conn| {
			for record in &pending {
				insert(conn, record)?;
			}
			Ok(())
		})?;
		Ok(pending.len())
	}

	/// Closes the cache. Staged records which were not flushed are lost.
	pub fn close(self) {
		if !self.pending.is_empty() {
			log::warn!("Discarding {} staged records which were never flushed", self.pending.len());
		}
	}

	/// Returns all extrinsics matching every supplied filter, ordered by id.
	pub fn query_extrinsics(
		&mut self,
		module: Option<&str>,
		call: Option<&str>,
		ids: Option<&[String]>,
	) -> Result<Vec<Extrinsic>, CacheError> {
		let mut query = extrinsics::table.into_boxed();
		if let Some(module) = module {
			query = query.filter(extrinsics::module.eq(module));
		}
		if let Some(call) = call {
			query = query.filter(extrinsics::call.eq(call));
		}
		if let Some(ids) = ids {
			query = query.filter(extrinsics::id.eq_any(ids.to_vec()));
		}
		Ok(query
			.order(extrinsics::id.asc())
			.select(Extrinsic::as_select())
			.load(&mut self.conn)?)
	}

	/// Returns the extrinsic with the given id, e.g. `"14238250-2"`.
	pub fn read_extrinsic(&mut self, id: &str) -> Result<Option<Extrinsic>, CacheError> {
		Ok(extrinsics::table
			.find(id)
			.select(Extrinsic::as_select())
			.first(&mut self.conn)
			.optional()?)
	}

	/// Returns all events matching every supplied filter, ordered by id.
	pub fn query_events(
		&mut self,
		module: Option<&str>,
		event: Option<&str>,
	) -> Result<Vec<Event>, CacheError> {
		let mut query = events::table.into_boxed();
		if let Some(module) = module {
			query = query.filter(events::module.eq(module));
		}
		if let Some(event) = event {
			query = query.filter(events::event.eq(event));
		}
		Ok(query.order(events::id.asc()).select(Event::as_select()).load(&mut self.conn)?)
	}

	/// Returns the event with the given id, e.g. `"14238250-5"`.
	pub fn read_event(&mut self, id: &str) -> Result<Option<Event>, CacheError> {
		Ok(events::table
			.find(id)
			.select(Event::as_select())
			.first(&mut self.conn)
			.optional()?)
	}

	/// Returns the ids which are not in the events table, in their original
	/// order.
	pub fn missing_ids(&mut self, ids: &[String]) -> Result<Vec<String>, CacheError> {
		if ids.is_empty() {
			return Ok(vec![]);
		}
		let present: HashSet<String> = events::table
			.filter(events::id.eq_any(ids.to_vec()))
			.select(events::id)
			.load::<String>(&mut self.conn)?
			.into_iter()
			.collect();
		Ok(ids.iter().filter(|id| !present.contains(*id)).cloned().collect())
	}

	/// Whether the block is committed or staged.
	pub fn has_block(&mut self, block_number: i64) -> Result<bool, CacheError> {
		if self
			.pending
			.iter()
			.any(|r| matches!(r, Record::Block(b) if b.block_number == block_number))
		{
			return Ok(true);
		}
		Ok(blocks::table.find(block_number).count().get_result::<i64>(&mut self.conn)? > 0)
	}

	/// Whether the extrinsic is committed or staged.
	pub fn has_extrinsic(&mut self, id: &str) -> Result<bool, CacheError> {
		if self.pending.iter().any(|r| matches!(r, Record::Extrinsic(e) if e.id == id)) {
			return Ok(true);
		}
		Ok(extrinsics::table.find(id).count().get_result::<i64>(&mut self.conn)? > 0)
	}

	/// Whether the event is committed or staged.
	pub fn has_event(&mut self, id: &str) -> Result<bool, CacheError> {
		if self.pending.iter().any(|r| matches!(r, Record::Event(e) if e.id == id)) {
			return Ok(true);
		}
		Ok(events::table.find(id).count().get_result::<i64>(&mut self.conn)? > 0)
	}

	/// Stages the block unless it is already known. Returns whether it was staged.
	pub fn ensure_block(&mut self, block_number: i64) -> Result<bool, CacheError> {
		if self.has_block(block_number)? {
			return Ok(false);
		}
		self.write(Block { block_number });
		Ok(true)
	}

	/// Writes a transfer.
	pub fn write_transfer(&mut self, _transfer: &Transfer) -> Result<bool, CacheError> {
		Err(CacheError::Unimplemented("writing transfers"))
	}

	/// Reads all transfers.
	pub fn read_transfers(&mut self) -> Result<Vec<Transfer>, CacheError> {
		Err(CacheError::Unimplemented("reading transfers"))
	}

	/// Whether the transfer with the given id is cached.
	pub fn has_transfer(&mut self, _id: &str) -> Result<bool, CacheError> {
		Err(CacheError::Unimplemented("looking up transfers"))
	}

	/// Reads the transfer with the given id.
	pub fn read_transfer(&mut self, _id: &str) -> Result<Option<Transfer>, CacheError> {
		Err(CacheError::Unimplemented("reading transfers"))
	}
}

fn insert(conn: &mut SqliteConnection, record: &Record) -> Result<(), CacheError> {
	let result = match record {
		Record::Block(block) => diesel::insert_into(blocks::table).values(block).execute(conn),
		Record::Extrinsic(extrinsic) =>
			diesel::insert_into(extrinsics::table).values(extrinsic).execute(conn),
		Record::Event(event) => diesel::insert_into(events::table).values(event).execute(conn),
	};
	result.map(|_| ()).map_err(CacheError::from_insert)
}
