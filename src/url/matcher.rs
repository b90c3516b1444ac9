/// Checks if a host matches a permitted-host pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and every
///    subdomain such as "blog.example.com" or "api.v2.example.com"
///
/// Both sides are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use strata_crawler::url::host_matches;
///
/// assert!(host_matches("example.com", "EXAMPLE.com"));
/// assert!(!host_matches("example.com", "blog.example.com"));
///
/// assert!(host_matches("*.example.com", "example.com"));
/// assert!(host_matches("*.example.com", "api.v2.example.com"));
/// assert!(!host_matches("*.example.com", "myexample.com"));
/// ```
pub fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}
