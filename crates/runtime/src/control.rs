//! Control API - request/response access to the terminal REST surface.
//!
//! The runtime does not interpret statuses; it only moves requests and raw
//! responses. Deciding that 404 on delete is fine, or that a list body must be
//! an array, belongs to the caller.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::BoxFuture;
use crate::error::{Error, Result};

/// HTTP verbs used by the terminal control API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
	Get,
	Post,
	Delete,
}

impl HttpMethod {
	fn as_reqwest(self) -> reqwest::Method {
		match self {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Post => reqwest::Method::POST,
			HttpMethod::Delete => reqwest::Method::DELETE,
		}
	}
}

/// A single control API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
	pub method: HttpMethod,
	pub url: Url,
	/// Sent as `Authorization: token <token>` when present and non-empty.
	pub token: Option<String>,
	/// JSON body.
	pub body: Option<Value>,
}

impl ApiRequest {
	pub fn get(url: Url) -> Self {
		Self {
			method: HttpMethod::Get,
			url,
			token: None,
			body: None,
		}
	}

	pub fn post(url: Url, body: Value) -> Self {
		Self {
			method: HttpMethod::Post,
			url,
			token: None,
			body: Some(body),
		}
	}

	pub fn delete(url: Url) -> Self {
		Self {
			method: HttpMethod::Delete,
			url,
			token: None,
			body: None,
		}
	}

	pub fn with_token(mut self, token: Option<String>) -> Self {
		self.token = token;
		self
	}
}

/// Raw control API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
	pub status: u16,
	pub url: String,
	pub body: String,
}

impl ApiResponse {
	/// Parses the body as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		serde_json::from_str(&self.body).map_err(Into::into)
	}

	/// Converts this response into [`Error::Response`], keeping the body.
	pub fn into_error(self) -> Error {
		Error::Response {
			status: self.status,
			url: self.url,
			body: self.body,
		}
	}
}

/// Capability to issue control API requests.
///
/// Implemented over HTTP by [`HttpControlApi`]; tests provide scripted
/// implementations.
pub trait ControlApi: Send + Sync {
	/// Sends a request and returns the raw response, whatever its status.
	///
	/// Only failures to obtain a response at all are errors here.
	fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>>;
}

/// [`ControlApi`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpControlApi {
	client: reqwest::Client,
}

impl HttpControlApi {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a client whose requests give up after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self { client })
	}

	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

impl ControlApi for HttpControlApi {
	fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>> {
		Box::pin(async move {
			let ApiRequest {
				method,
				url,
				token,
				body,
			} = request;
			let url_string = url.to_string();

			debug!(?method, url = %url_string, "control request");

			let mut builder = self.client.request(method.as_reqwest(), url);
			if let Some(token) = token.as_deref().filter(|t| !t.is_empty()) {
				builder = builder.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
			}
			if let Some(body) = &body {
				builder = builder.json(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			debug!(status, url = %url_string, "control response");

			Ok(ApiResponse {
				status,
				url: url_string,
				body,
			})
		})
	}
}
