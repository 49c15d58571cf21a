//! Cache Key Builder
//!
//! Derives canonical cache keys from an endpoint and an optional parameter bag.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Separates the endpoint from the encoded parameters.
pub const KEY_DELIMITER: char = '?';

/// Builds the cache key for `endpoint` queried with `params`.
///
/// Without parameters the endpoint is returned unchanged. Otherwise the
/// parameter bag is re-encoded as compact JSON with its keys sorted
/// lexicographically, so two bags holding the same pairs always produce the
/// same key whatever order they were built in.
pub fn cache_key(endpoint: &str, params: Option<&Map<String, Value>>) -> String {
    let Some(params) = params else {
        return endpoint.to_string();
    };

    let sorted: BTreeMap<&String, &Value> = params.iter().collect();
    let canonical: Map<String, Value> = sorted
        .into_iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    format!("{endpoint}{KEY_DELIMITER}{}", Value::Object(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_params_returns_endpoint() {
        assert_eq!(cache_key("/knowledge", None), "/knowledge");
    }

    #[test]
    fn test_params_are_sorted() {
        let params = json!({"page": 1, "category": "rust", "size": 10});
        assert_eq!(
            cache_key("/knowledge", params.as_object()),
            r#"/knowledge?{"category":"rust","page":1,"size":10}"#
        );
    }

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let mut forward = Map::new();
        forward.insert("a".to_string(), json!(1));
        forward.insert("b".to_string(), json!(2));

        let mut backward = Map::new();
        backward.insert("b".to_string(), json!(2));
        backward.insert("a".to_string(), json!(1));

        assert_eq!(
            cache_key("x", Some(&forward)),
            cache_key("x", Some(&backward))
        );
    }

    #[test]
    fn test_empty_bag_still_appends() {
        assert_eq!(cache_key("/tags", Some(&Map::new())), "/tags?{}");
    }

    #[test]
    fn test_different_values_differ() {
        let one = json!({"page": 1});
        let two = json!({"page": 2});
        assert_ne!(
            cache_key("/knowledge", one.as_object()),
            cache_key("/knowledge", two.as_object())
        );
    }
}
