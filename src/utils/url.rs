//! URL helpers for the inference service.
//!
//! The service is configured by its root URL. Older configurations point at
//! the `generate` endpoint itself, so [`service_root`] accepts both forms.

const GENERATE_ENDPOINT: &str = "generate";

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use nebras::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/"), "https://api.example.com");
/// assert_eq!(normalize_base_url("https://api.example.com///"), "https://api.example.com");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Construct an endpoint URL from a base URL without doubling slashes
///
/// # Examples
///
/// ```
/// use nebras::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/", "/generate"),
///     "https://api.example.com/generate"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Reduce a configured URL to the service root, dropping a trailing
/// `/generate` segment if present.
pub fn service_root(configured: &str) -> String {
    let normalized = normalize_base_url(configured);
    match normalized.strip_suffix(GENERATE_ENDPOINT) {
        Some(rest) if rest.ends_with('/') => normalize_base_url(rest),
        _ => normalized,
    }
}

/// `POST` target for text generation.
pub fn generate_url(root: &str) -> String {
    construct_api_url(root, GENERATE_ENDPOINT)
}

/// `GET` target used as the health probe.
pub fn health_url(root: &str) -> String {
    format!("{}/", normalize_base_url(root))
}
