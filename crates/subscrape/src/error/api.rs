// SPDX-License-Identifier: GPL-3.0

//! Subscan API error types.

use std::{error::Error as _, time::SystemTimeError};
use thiserror::Error;
use tokio::sync::AcquireError;

/// An error returned by the API client.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ApiError {
	/// A decoding error occurred.
	#[error("Decoding error: {0}")]
	DecodeError(#[from] serde_json::Error),
	/// A HTTP error occurred.
	#[error("HTTP error: {0} caused by {:?}", reqwest::Error::source(.0))]
	HttpError(#[from] reqwest::Error),
	/// The request middleware failed, e.g. after exhausting its retries.
	#[error("Middleware error: {0}")]
	MiddlewareError(String),
	/// Subscan answered with a non-zero status code.
	#[error("Subscan error {code}: {message}")]
	SubscanError {
		/// The Subscan status code.
		code: i64,
		/// The accompanying message.
		message: String,
	},
	/// Subscan answered successfully but without a payload.
	#[error("Subscan returned no data for {0}")]
	MissingData(String),
	/// An endpoint URL could not be built.
	#[error("URL error: {0}")]
	UrlError(#[from] url::ParseError),
	/// An error occurred acquiring a lock.
	#[error("Lock acquisition error")]
	LockAcquisitionError,
	/// An error occurred while attempting to convert a time.
	#[error("Time error: {0}")]
	TimeError(#[from] SystemTimeError),
	/// A synchronization error occurred.
	#[error("Synchronization error: {0}")]
	SynchronizationError(#[from] AcquireError),
}

impl From<reqwest_middleware::Error> for ApiError {
	fn from(e: reqwest_middleware::Error) -> Self {
		match e {
			reqwest_middleware::Error::Reqwest(e) => ApiError::HttpError(e),
			reqwest_middleware::Error::Middleware(e) => ApiError::MiddlewareError(format!("{e:#}")),
		}
	}
}
