//! Local server URL composition and recognition.
//!
//! The server listens on `http://localhost:<port>/`, optionally scoped to a
//! profile as `http://localhost:<port>/profile/<profileId>`.

use url::Url;

use super::error::ClientError;
use super::types::SetupRequest;

/// Base URL of the local server for the given port.
pub fn base_url(port: u16) -> String {
    format!("http://localhost:{}/", port)
}

/// Parse a caller-supplied server URL, accepting only http(s).
pub fn validate(server_url: &str) -> Result<Url, ClientError> {
    let url = Url::parse(server_url.trim())
        .map_err(|e| ClientError::InvalidRequest(format!("'{}' is not a valid URL: {}", server_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidRequest(format!(
            "unsupported URL scheme '{}'",
            other
        ))),
    }
}

/// Check a request before any file is touched.
pub fn validate_request(request: &SetupRequest) -> Result<(), ClientError> {
    if request.alias.trim().is_empty() {
        return Err(ClientError::InvalidRequest("alias must not be empty".into()));
    }
    validate(&request.server_url)?;
    Ok(())
}

/// The URL a setup request registers: the server URL, with the profile path
/// appended when the request names one.
pub fn target_url(request: &SetupRequest) -> Result<String, ClientError> {
    let server_url = request.server_url.trim();
    match request.profile_id.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(profile) => append_profile(server_url, profile),
        None => Ok(server_url.to_string()),
    }
}

fn append_profile(server_url: &str, profile: &str) -> Result<String, ClientError> {
    let mut url = validate(server_url)?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidRequest(format!("'{}' cannot carry a path", server_url)))?
        .pop_if_empty()
        .push("profile")
        .push(profile.trim());
    Ok(url.to_string())
}

/// Whether `candidate` points at this server on `port`.
///
/// Only the literal host name `localhost` is recognized; `127.0.0.1` and other
/// loopback spellings are not.
pub fn is_local_server_url(candidate: &str, port: u16) -> bool {
    candidate.contains("localhost") && candidate.contains(&format!(":{}", port))
}

/// Equality used when verifying a written entry: exact match, tolerating a
/// single trailing slash difference.
pub fn same_url(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}
