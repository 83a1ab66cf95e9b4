use serde_json::{Map, Value};
use url::form_urlencoded;

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_query_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        }
        other => Some(other.to_string()),
    }
}

pub fn build_query_string(params: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .filter_map(|(key, value)| render_query_value(value).map(|v| (key.as_str(), v)))
        .collect();
    if pairs.is_empty() {
        return String::new();
    }
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    format!("?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn empty_map_yields_empty_string() {
        assert_eq!(build_query_string(&Map::new()), "");
    }

    #[test]
    fn null_and_empty_values_are_dropped() {
        let query = build_query_string(&params(json!({
            "page": 2,
            "tag_name": "",
            "region": null,
        })));
        assert_eq!(query, "?page=2");
        assert!(!query.contains("tag_name"));
        assert!(!query.contains("region"));
    }

    #[test]
    fn all_filtered_yields_no_question_mark() {
        assert_eq!(build_query_string(&params(json!({"a": null, "b": ""}))), "");
    }

    #[test]
    fn values_are_percent_encoded_and_stringified() {
        let query = build_query_string(&params(json!({
            "name": "web 01&x",
            "per_page": 20,
            "untagged": true,
        })));
        assert_eq!(query, "?name=web+01%26x&per_page=20&untagged=true");
    }

    #[test]
    fn serialization_is_stable() {
        let input = params(json!({"z": 1, "a": "b", "m": [1, 2]}));
        let first = build_query_string(&input);
        let second = build_query_string(&input);
        assert_eq!(first, second);
        assert_eq!(first, "?a=b&m=1%2C2&z=1");
    }
}
