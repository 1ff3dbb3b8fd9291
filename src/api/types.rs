use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field-level validation issue reported by the server.
///
/// Only `path` and `message` are interpreted; anything else the server sends
/// is kept in `extra` and round-trips unchanged. `path` is usually an array of
/// keys, but servers also send a bare field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub path: Value,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Issue for a single top-level field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Value::Array(vec![Value::String(field.into())]),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Reads an issue of any shape without failing.
    ///
    /// Objects keep their `path`, a string `message` and the remaining keys.
    /// A bare string becomes the message; any other value is kept as text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut extra) => {
                let path = extra.remove("path").unwrap_or(Value::Null);
                let message = match extra.remove("message") {
                    Some(Value::String(message)) => message,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                Self {
                    path,
                    message,
                    extra,
                }
            }
            Value::String(message) => Self {
                path: Value::Null,
                message,
                extra: Map::new(),
            },
            other => Self {
                path: Value::Null,
                message: other.to_string(),
                extra: Map::new(),
            },
        }
    }

    /// Reads the `issues` member of a validation payload.
    ///
    /// A missing or `null` member, or anything that is not an array, yields no issues.
    pub fn list_from(issues: Option<&Value>) -> Vec<Issue> {
        match issues {
            Some(Value::Array(items)) => items.iter().cloned().map(Issue::from_value).collect(),
            _ => Vec::new(),
        }
    }
}

/// Query string parameters of a list or item request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing a previous value.
    pub fn set(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Projection of returned fields, e.g. `items(*),count`.
    pub fn fields(self, fields: &str) -> Self {
        self.set("fields", fields)
    }

    pub fn limit(self, limit: u64) -> Self {
        self.set("limit", limit)
    }

    pub fn skip(self, skip: u64) -> Self {
        self.set("skip", skip)
    }

    pub fn sort(self, sort: &str) -> Self {
        self.set("sort", sort)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Success envelope returned by the backend: `{"result": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub result: Value,
}

impl ApiResponse {
    pub fn new(result: Value) -> Self {
        Self { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_keeps_unknown_fields() {
        let raw = json!({"path": ["title"], "message": "required", "rule": "required"});
        let issue: Issue = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(issue.message, "required");
        assert_eq!(issue.extra.get("rule"), Some(&json!("required")));
        assert_eq!(serde_json::to_value(&issue).unwrap(), raw);
    }

    #[test]
    fn test_issue_from_any_shape() {
        let issue = Issue::from_value(json!({"path": "title", "message": "required", "code": 7}));
        assert_eq!(issue.path, json!("title"));
        assert_eq!(issue.message, "required");
        assert_eq!(issue.extra.get("code"), Some(&json!(7)));

        let issue = Issue::from_value(json!({"message": {"ru": "обязательно"}}));
        assert_eq!(issue.path, Value::Null);
        assert_eq!(issue.message, r#"{"ru":"обязательно"}"#);

        assert_eq!(Issue::from_value(json!("title is required")).message, "title is required");
    }

    #[test]
    fn test_issue_list_tolerates_missing_and_null() {
        assert!(Issue::list_from(None).is_empty());
        assert!(Issue::list_from(Some(&Value::Null)).is_empty());
        assert!(Issue::list_from(Some(&json!({"title": "required"}))).is_empty());
        assert_eq!(
            Issue::list_from(Some(&json!([{"path": ["title"], "message": "required"}]))),
            vec![Issue::new("title", "required")]
        );
    }

    #[test]
    fn test_query_params_builder() {
        let q = QueryParams::new().fields("items(*),count").limit(1000);
        assert_eq!(q.get("limit"), Some("1000"));
        assert_eq!(
            q.iter().collect::<Vec<_>>(),
            vec![("fields", "items(*),count"), ("limit", "1000")]
        );
    }
}
