//! URL helpers for joining backend endpoints onto the configured API root.

/// Remove trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use agentdesk::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api"), "http://localhost:8000/api");
/// assert_eq!(normalize_base_url("http://localhost:8000/api///"), "http://localhost:8000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join an endpoint path onto a base URL with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use agentdesk::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/", "/mcp/servers"),
///     "http://localhost:8000/api/mcp/servers"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
