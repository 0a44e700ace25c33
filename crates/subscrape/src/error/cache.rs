// SPDX-License-Identifier: GPL-3.0

//! Cache-related error types.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::error::Error as StdError;
use thiserror::Error;

/// Errors that can occur when interacting with the scrape cache.
#[derive(Debug, Error)]
pub enum CacheError {
	/// Database error.
	#[error("Database error: {0}")]
	Database(#[from] DieselError),
	/// Database connection error.
	#[error("Database connection error: {0}")]
	Connection(#[from] diesel::result::ConnectionError),
	/// Migration error.
	#[error("Migration error: {0}")]
	Migration(String),
	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// A JSON column could not be encoded or decoded.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
	/// A record with the same primary key already exists.
	#[error("Unique constraint violation: {0}")]
	UniqueConstraintViolation(String),
	/// Data corruption detected in the cache.
	#[error("Data corruption: {0}")]
	DataCorruption(String),
	/// The operation is not implemented by the cache.
	#[error("Not implemented: {0}")]
	Unimplemented(&'static str),
}

impl CacheError {
	/// Classifies a diesel error, surfacing primary key clashes as
	/// [`CacheError::UniqueConstraintViolation`].
	pub(crate) fn from_insert(error: DieselError) -> Self {
		match error {
			DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) =>
				CacheError::UniqueConstraintViolation(info.message().to_string()),
			other => CacheError::Database(other),
		}
	}
}

impl From<Box<dyn StdError + Send + Sync>> for CacheError {
	fn from(e: Box<dyn StdError + Send + Sync>) -> Self {
		// Migrations return boxed errors; fold them into a descriptive error variant
		CacheError::Migration(format!("{e}"))
	}
}
