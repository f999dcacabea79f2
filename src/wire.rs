use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::Operation;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
}

impl<'a> From<&'a Operation> for GraphQlRequest<'a> {
    fn from(operation: &'a Operation) -> Self {
        Self {
            query: &operation.query,
            variables: &operation.variables,
            operation_name: operation.operation_name.as_deref(),
        }
    }
}

/// GraphQL response envelope. Everything besides `data` stays untyped: some
/// servers send a single error object instead of an array, or a structured
/// `message`.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQlEnvelope {
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub errors: Option<JsonValue>,
    #[serde(default)]
    pub message: Option<JsonValue>,
}

impl GraphQlEnvelope {
    pub fn message_text(&self) -> Option<String> {
        match self.message.as_ref()? {
            JsonValue::Null => None,
            JsonValue::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// One entry of a GraphQL `errors` array. Side fields are kept as raw JSON
/// and read on demand, so a badly typed `extensions` member cannot hide the
/// error code.
#[derive(Debug, Default, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub message: Option<JsonValue>,
    #[serde(default)]
    pub path: Option<JsonValue>,
    #[serde(default)]
    pub code: Option<JsonValue>,
    #[serde(default)]
    pub extensions: Option<JsonValue>,
}

impl WireError {
    fn extension(&self, name: &str) -> Option<&JsonValue> {
        self.extensions.as_ref()?.get(name)
    }

    /// `extensions.code`, falling back to a top-level `code`.
    pub fn code(&self) -> Option<&str> {
        self.extension("code")
            .and_then(JsonValue::as_str)
            .or_else(|| self.code.as_ref().and_then(JsonValue::as_str))
    }

    /// `extensions.retryable` when the server sent a boolean.
    pub fn retryable(&self) -> Option<bool> {
        self.extension("retryable").and_then(JsonValue::as_bool)
    }

    pub fn message_text(&self) -> String {
        match &self.message {
            Some(JsonValue::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn path_text(&self) -> Option<String> {
        let path = self
            .path
            .as_ref()
            .and_then(JsonValue::as_array)
            .filter(|path| !path.is_empty())?;
        Some(
            path.iter()
                .map(|segment| match segment {
                    JsonValue::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GraphQlEnvelope, GraphQlRequest, WireError};
    use crate::Operation;

    #[test]
    fn request_body_uses_graphql_field_names() {
        let op = Operation::new("query A { a } query B { b }")
            .variable("first", 10)
            .operation_name("B");
        let body = serde_json::to_value(GraphQlRequest::from(&op)).expect("must serialize");
        assert_eq!(
            body,
            json!({
                "query": "query A { a } query B { b }",
                "variables": { "first": 10 },
                "operationName": "B"
            })
        );
    }

    #[test]
    fn request_body_omits_missing_operation_name() {
        let op = Operation::new("{ getUser { email } }");
        let body = serde_json::to_value(GraphQlRequest::from(&op)).expect("must serialize");
        assert_eq!(body, json!({ "query": "{ getUser { email } }", "variables": {} }));
    }

    #[test]
    fn error_code_prefers_extensions() {
        let err: WireError = serde_json::from_value(json!({
            "message": "slow",
            "code": "LEGACY",
            "path": ["getTables", 0, "mcon"],
            "extensions": { "code": "REQUEST_TIMEOUT" }
        }))
        .expect("must decode");
        assert_eq!(err.code(), Some("REQUEST_TIMEOUT"));
        assert_eq!(err.path_text().as_deref(), Some("getTables/0/mcon"));

        let legacy: WireError =
            serde_json::from_value(json!({ "message": "x", "code": "LEGACY" })).expect("decode");
        assert_eq!(legacy.code(), Some("LEGACY"));
    }

    #[test]
    fn badly_typed_side_fields_do_not_hide_the_code() {
        let err: WireError = serde_json::from_value(json!({
            "message": "slow",
            "path": "getTables",
            "extensions": { "code": "REQUEST_TIMEOUT", "retryable": "yes" }
        }))
        .expect("must decode");
        assert_eq!(err.code(), Some("REQUEST_TIMEOUT"));
        assert_eq!(err.retryable(), None);
        assert_eq!(err.path_text(), None);

        let odd: WireError =
            serde_json::from_value(json!({ "message": "x", "extensions": "opaque", "code": 7 }))
                .expect("must decode");
        assert_eq!(odd.code(), None);
    }

    #[test]
    fn envelope_message_may_be_structured() {
        let envelope: GraphQlEnvelope =
            serde_json::from_value(json!({ "data": { "ok": true }, "message": { "detail": "x" } }))
                .expect("must decode");
        assert!(envelope.data.is_some());
        assert_eq!(envelope.message_text().as_deref(), Some(r#"{"detail":"x"}"#));
    }
}
