// SPDX-License-Identifier: GPL-3.0

//! Access to the Subscan indexing API.

mod subscan;
mod types;

pub use subscan::SubscanApi;

use crate::error::ApiError;
use bytes::Bytes;
use reqwest::{IntoUrl, header::CONTENT_TYPE};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
	ops::Deref,
	sync::{Arc, Mutex},
	time::{Duration, SystemTime},
};
use tokio::sync::Semaphore;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Header carrying the Subscan API key.
const API_KEY_HEADER: &str = "X-API-Key";
/// How often a transient failure is retried.
const MAX_RETRIES: u32 = 3;

/// An API client.
pub(crate) struct ApiClient {
	client: ClientWithMiddleware,
	permits: Arc<Semaphore>,
	api_key: Option<String>,
	rate_limits: Arc<Mutex<RateLimits>>,
}

impl ApiClient {
	/// A new API Client.
	///
	/// # Arguments
	/// * `max_concurrent` - The maximum number of concurrent requests.
	/// * `api_key` - An optional API key. If provided, the client will include an `X-API-Key`
	///   header with every request.
	pub(crate) fn new(max_concurrent: usize, api_key: Option<String>) -> Result<Self, ApiError> {
		let client = reqwest::Client::builder().user_agent(APP_USER_AGENT).build()?;
		let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
		let client = ClientBuilder::new(client)
			.with(RetryTransientMiddleware::new_with_policy(retry_policy))
			.build();
		Ok(Self {
			client,
			permits: Arc::new(Semaphore::new(max_concurrent)),
			api_key,
			rate_limits: Arc::new(Mutex::new(RateLimits::default())),
		})
	}

	/// Sends a POST request with a JSON body to the provided URL.
	///
	/// # Arguments
	/// * `url` - The URL of the API endpoint to request.
	/// * `body` - The JSON payload.
	pub(crate) async fn post(&self, url: impl IntoUrl, body: &Value) -> Result<ApiResponse, ApiError> {
		let url = url.into_url()?;

		// Acquire a permit based on the concurrency control
		let _permit = self.permits.acquire().await?;

		// Wait out an exhausted rate limit before sending anything
		let wait = self.rate_limits.lock().map_err(|_| ApiError::LockAcquisitionError)?.wait()?;
		if let Some(wait) = wait {
			log::info!("Rate limit exhausted, waiting {}s", wait.as_secs());
			tokio::time::sleep(wait).await;
		}

		// Build request, adding any key if present
		let mut request = self
			.client
			.post(url.clone())
			.header(CONTENT_TYPE, "application/json")
			.body(serde_json::to_vec(body)?);
		if let Some(api_key) = &self.api_key {
			request = request.header(API_KEY_HEADER, api_key);
		}

		log::debug!("POST {url} {body}");
		let response = request.send().await?;

		// Update rate limits from response headers
		{
			let headers = response.headers();
			let header = |name: &str| {
				headers.get(name).and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<u64>().ok())
			};
			let mut rate_limits =
				self.rate_limits.lock().map_err(|_| ApiError::LockAcquisitionError)?;
			rate_limits.limit = header("x-ratelimit-limit");
			rate_limits.remaining = header("x-ratelimit-remaining");
			rate_limits.reset = header("ratelimit-reset");
			rate_limits.retry_after = header("retry-after");
			rate_limits.observed_at =
				Some(SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?.as_secs());
		}

		let response = response.error_for_status()?;
		Ok(ApiResponse(response.bytes().await?))
	}
}

/// An API response.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ApiResponse(Bytes);

impl ApiResponse {
	/// Attempts to deserialize the API response as JSON.
	pub(crate) fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
		serde_json::from_slice(&self.0).map_err(|e| e.into())
	}
}

impl Deref for ApiResponse {
	type Target = [u8];

	#[inline]
	fn deref(&self) -> &[u8] {
		self.0.deref()
	}
}

/// The rate limit state reported by the last response.
///
/// `reset` and `retry_after` are relative to `observed_at`, in seconds.
#[derive(Debug, Default, PartialEq)]
struct RateLimits {
	limit: Option<u64>,
	remaining: Option<u64>,
	reset: Option<u64>,
	retry_after: Option<u64>,
	observed_at: Option<u64>,
}

impl RateLimits {
	/// How long to wait before the next request may be sent.
	fn wait(&self) -> Result<Option<Duration>, ApiError> {
		if self.remaining != Some(0) {
			return Ok(None);
		}
		let (Some(observed_at), Some(delay)) = (self.observed_at, self.reset.or(self.retry_after))
		else {
			return Ok(None);
		};
		let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?.as_secs();
		Ok((observed_at + delay).checked_sub(now).filter(|s| *s > 0).map(Duration::from_secs))
	}
}

#[cfg(test)]
mod tests {
	use super::{ApiError::*, *};
	use mockito::{Matcher, Server};
	use reqwest::StatusCode;
	use serde_json::json;
	use std::error::Error;

	const LIMIT: u64 = 60;
	const REMAINING: u64 = 10;
	const RESET: u64 = 30;
	const API_KEY: &str = "<API_KEY>";

	#[tokio::test]
	async fn api_key_authorization_works() -> Result<(), Box<dyn Error>> {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/auth")
			.with_status(StatusCode::OK.as_u16().into())
			.match_header("X-API-Key", API_KEY)
			.create_async()
			.await;

		let client = ApiClient::new(1, Some(API_KEY.into()))?;
		client.post(format!("{}/auth", server.url()), &json!({})).await?;

		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn sends_json_body() -> Result<(), Box<dyn Error>> {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/body")
			.match_header("content-type", "application/json")
			.match_body(Matcher::Json(json!({ "row": 100, "page": 0 })))
			.with_status(StatusCode::OK.as_u16().into())
			.create_async()
			.await;

		let client = ApiClient::new(1, None)?;
		client.post(format!("{}/body", server.url()), &json!({ "row": 100, "page": 0 })).await?;

		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn extracts_rate_limits_from_response_headers() -> Result<(), Box<dyn Error>> {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/rate-limits")
			.with_header("x-ratelimit-limit", LIMIT.to_string().as_str())
			.with_header("x-ratelimit-remaining", REMAINING.to_string().as_str())
			.with_header("ratelimit-reset", RESET.to_string().as_str())
			.with_status(StatusCode::OK.as_u16().into())
			.create_async()
			.await;

		let client = ApiClient::new(1, Some(API_KEY.into()))?;
		client.post(format!("{}/rate-limits", server.url()), &json!({})).await?;

		{
			let rate_limits = client.rate_limits.lock().unwrap();
			assert_eq!(rate_limits.limit, Some(LIMIT));
			assert_eq!(rate_limits.remaining, Some(REMAINING));
			assert_eq!(rate_limits.reset, Some(RESET));
			assert_eq!(rate_limits.retry_after, None);
			assert!(rate_limits.observed_at.is_some());
		}

		mock.assert_async().await;
		Ok(())
	}

	#[test]
	fn waits_only_when_no_requests_remaining() -> Result<(), Box<dyn Error>> {
		let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?.as_secs();
		let mut rate_limits = RateLimits {
			limit: Some(LIMIT),
			remaining: Some(REMAINING),
			reset: Some(RESET),
			retry_after: None,
			observed_at: Some(now),
		};
		assert_eq!(rate_limits.wait()?, None);

		rate_limits.remaining = Some(0);
		let wait = rate_limits.wait()?.expect("exhausted rate limit must wait");
		assert!(wait <= Duration::from_secs(RESET));

		// The reset already passed
		rate_limits.observed_at = Some(now - 2 * RESET);
		assert_eq!(rate_limits.wait()?, None);
		Ok(())
	}

	#[tokio::test]
	async fn returns_underlying_error_otherwise() -> Result<(), Box<dyn Error>> {
		const STATUS_CODE: StatusCode = StatusCode::FORBIDDEN;

		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/error")
			.with_status(STATUS_CODE.as_u16().into())
			.create_async()
			.await;

		let client = ApiClient::new(1, None)?;
		assert!(matches!(
				client.post(format!("{}/error", server.url()), &json!({})).await,
				Err(HttpError(e)) if e.status() == Some(STATUS_CODE)));

		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn returns_json() -> Result<(), Box<dyn Error>> {
		let payload = b"{\"key\": \"value\"}";

		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/json")
			.with_status(StatusCode::OK.as_u16().into())
			.with_body(payload)
			.expect(2)
			.create_async()
			.await;

		let client = ApiClient::new(1, None)?;
		let response = client
			.post(format!("{}/json", server.url()), &json!({}))
			.await?
			.json::<serde_json::Value>()?;
		assert_eq!(response, serde_json::json!({ "key": "value" }));
		assert_eq!(
			*client.post(format!("{}/json", server.url()), &json!({})).await?,
			*payload
		);

		mock.assert_async().await;
		Ok(())
	}
}
