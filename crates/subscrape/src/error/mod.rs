// SPDX-License-Identifier: GPL-3.0

//! Error types for scrape operations.
//!
//! This module contains all error types used throughout the `subscrape` crate,
//! organized by context:
//!
//! - [`cache::CacheError`] - Errors from SQLite cache operations.
//! - [`api::ApiError`] - Errors from Subscan API requests.
//! - [`config::ConfigError`] - Errors from reading the scrape configuration.

pub mod api;
pub mod cache;
pub mod config;

pub use api::ApiError;
pub use cache::CacheError;
pub use config::ConfigError;
use thiserror::Error;

/// Errors that can abort a scrape.
#[derive(Debug, Error)]
pub enum Error {
	/// The Subscan API failed.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// The cache failed.
	#[error(transparent)]
	Cache(#[from] CacheError),
	/// The scrape configuration is malformed.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
