//! Cache key derivation.
//!
//! A key is the request path followed by the query parameters as a JSON object
//! with sorted names, so `?b=2&a=1` and `?a=1&b=2` share an entry. Request
//! bodies never contribute.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Builds the cache key for a path and raw (still percent-encoded) query.
pub fn cache_key(path: &str, query: Option<&str>) -> String {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if let Some(query) = query {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }

    let object: Map<String, Value> = params
        .into_iter()
        .map(|(name, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                values.sort();
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (name, value)
        })
        .collect();

    format!("{}:{}", path, Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_query() {
        assert_eq!(cache_key("/list", None), "/list:{}");
        assert_eq!(cache_key("/list", Some("")), "/list:{}");
    }

    #[test]
    fn test_query_order_is_canonical() {
        assert_eq!(
            cache_key("/proposals", Some("status=open&page=2")),
            cache_key("/proposals", Some("page=2&status=open"))
        );
        assert_eq!(
            cache_key("/proposals", Some("status=open&page=2")),
            r#"/proposals:{"page":"2","status":"open"}"#
        );
    }

    #[test]
    fn test_repeated_params_are_sorted() {
        assert_eq!(
            cache_key("/users", Some("role=b&role=a")),
            r#"/users:{"role":["a","b"]}"#
        );
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            cache_key("/users", Some("q=ada%20lovelace")),
            cache_key("/users", Some("q=ada+lovelace"))
        );
    }

    #[test]
    fn test_distinct_paths() {
        assert_ne!(cache_key("/a", None), cache_key("/b", None));
    }
}
