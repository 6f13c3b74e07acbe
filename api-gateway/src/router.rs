//! Path matching for API Gateway proxy events.

use std::collections::BTreeMap;

use shared::Error;

/// Strip the `/api` stage prefix and any trailing slash.
pub fn normalize_path(raw_path: &str) -> &str {
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Match `path` against a pattern such as `/patients/{id}/messages`,
/// returning the captured segments.
pub fn match_route(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());
    let mut params = BTreeMap::new();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    params.insert(name.to_string(), actual.to_string());
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

pub fn route_not_found() -> Error {
    Error::not_found("NOT_FOUND", "Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_captures_params() {
        let params = match_route("/patients/{id}/messages", "/patients/abc/messages").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_match_rejects_different_shapes() {
        assert!(match_route("/patients/{id}", "/patients").is_none());
        assert!(match_route("/patients/{id}", "/patients/abc/messages").is_none());
        assert!(match_route("/patients", "/chat").is_none());
        assert!(match_route("/patients", "/patients").unwrap().is_empty());
    }

    #[test]
    fn test_normalize_strips_stage_prefix() {
        assert_eq!(normalize_path("/api/patients/"), "/patients");
        assert_eq!(normalize_path("/chat"), "/chat");
        assert_eq!(normalize_path("/api"), "/");
    }
}
