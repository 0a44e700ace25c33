// SPDX-License-Identifier: GPL-3.0

//! Configuration error types.

use thiserror::Error;

/// Errors found while reading the scrape configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	/// A node of the configuration tree has an unexpected shape.
	#[error("`{path}` must be {expected}")]
	InvalidShape {
		/// Where in the configuration tree the node was found.
		path: String,
		/// What was expected instead.
		expected: &'static str,
	},
	/// A metadata value is out of its valid range.
	#[error("`{key}` is out of range: {value}")]
	OutOfRange {
		/// The metadata key.
		key: &'static str,
		/// The rejected value.
		value: String,
	},
	/// Transfers were requested without naming an account.
	#[error("`transfers` requires at least one account")]
	MissingAccounts,
}
