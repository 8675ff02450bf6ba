//! URL joining for REST endpoints and channel addresses.

use url::Url;

use crate::error::{Error, Result};

/// Appends path segments to `base`, percent-encoding each one.
///
/// A trailing slash on `base` is ignored, so `http://h/api` and
/// `http://h/api/` join identically. Query and fragment are dropped.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
	let mut url = base.clone();
	url.set_query(None);
	url.set_fragment(None);
	{
		let mut path = url
			.path_segments_mut()
			.map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
		path.pop_if_empty();
		for segment in segments {
			path.push(segment);
		}
	}
	Ok(url)
}

/// Derives a WebSocket base from an HTTP base (`http` → `ws`, `https` → `wss`).
///
/// URLs already using a WebSocket scheme are returned unchanged.
pub fn to_ws_base(base: &Url) -> Result<Url> {
	let scheme = match base.scheme() {
		"http" | "ws" => "ws",
		"https" | "wss" => "wss",
		other => {
			return Err(Error::ConnectionFailed(format!("cannot derive a WebSocket URL from scheme '{other}'")));
		}
	};
	let mut url = base.clone();
	url.set_scheme(scheme)
		.map_err(|()| Error::ConnectionFailed(format!("cannot switch {base} to {scheme}")))?;
	Ok(url)
}

/// Appends `token` as a query parameter. Empty tokens leave the URL untouched.
pub fn with_token(mut url: Url, token: &str) -> Url {
	if !token.is_empty() {
		url.query_pairs_mut().append_pair("token", token);
	}
	url
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn test_join_ignores_trailing_slash() {
		let a = join_segments(&url("http://localhost:8888/api"), &["terminals", "1"]).unwrap();
		let b = join_segments(&url("http://localhost:8888/api/"), &["terminals", "1"]).unwrap();
		assert_eq!(a.as_str(), "http://localhost:8888/api/terminals/1");
		assert_eq!(a, b);
	}

	#[test]
	fn test_join_encodes_segments() {
		let joined = join_segments(&url("http://localhost/"), &["terminals", "a b/c"]).unwrap();
		assert_eq!(joined.as_str(), "http://localhost/terminals/a%20b%2Fc");
	}

	#[test]
	fn test_join_drops_query() {
		let joined = join_segments(&url("http://localhost/api/?x=1"), &["terminals"]).unwrap();
		assert_eq!(joined.as_str(), "http://localhost/api/terminals");
	}

	#[test]
	fn test_ws_base_from_http() {
		assert_eq!(to_ws_base(&url("http://h:1/base/")).unwrap().as_str(), "ws://h:1/base/");
		assert_eq!(to_ws_base(&url("https://h/")).unwrap().as_str(), "wss://h/");
		assert_eq!(to_ws_base(&url("wss://h/")).unwrap().as_str(), "wss://h/");
		assert!(to_ws_base(&url("ftp://h/")).is_err());
	}

	#[test]
	fn test_with_token() {
		let base = url("ws://h/terminals/websocket/1");
		assert_eq!(with_token(base.clone(), "").as_str(), "ws://h/terminals/websocket/1");
		assert_eq!(with_token(base, "s3cr t").as_str(), "ws://h/terminals/websocket/1?token=s3cr+t");
	}
}
