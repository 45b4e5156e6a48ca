//! Operation-name normalization.
//!
//! An exported operation whose name case-insensitively matches one of the
//! standard HTTP method tokens is a route verb; it is stored under a
//! distinguished `$`-prefixed lowercase key so the host can tell verbs
//! apart from auxiliary exports. Everything else is preserved verbatim.

use http::Method;

/// Marker prefix for normalized HTTP-method operation names.
pub const METHOD_MARKER: char = '$';

/// The recognized HTTP method tokens, lowercase.
const HTTP_METHODS: [&str; 9] = [
    "get", "post", "put", "delete", "head", "options", "trace", "connect", "patch",
];

/// Returns `true` if `name` matches an HTTP method token, ignoring case.
///
/// # Example
///
/// ```rust
/// use palisade_discovery::is_http_method;
///
/// assert!(is_http_method("get"));
/// assert!(is_http_method("Patch"));
/// assert!(!is_http_method("helper"));
/// ```
#[must_use]
pub fn is_http_method(name: &str) -> bool {
    HTTP_METHODS
        .iter()
        .any(|m| name.eq_ignore_ascii_case(m))
}

/// Normalizes an operation name.
///
/// Method tokens become `$` + the lowercase token; any other name is
/// returned unchanged.
///
/// # Example
///
/// ```rust
/// use palisade_discovery::normalize_operation;
///
/// assert_eq!(normalize_operation("GET"), "$get");
/// assert_eq!(normalize_operation("helper"), "helper");
/// ```
#[must_use]
pub fn normalize_operation(name: &str) -> String {
    if is_http_method(name) {
        format!("{}{}", METHOD_MARKER, name.to_ascii_lowercase())
    } else {
        name.to_string()
    }
}

/// Returns the group key the host looks up for an incoming method.
#[must_use]
pub fn method_key(method: &Method) -> String {
    format!(
        "{}{}",
        METHOD_MARKER,
        method.as_str().to_ascii_lowercase()
    )
}
