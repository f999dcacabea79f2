use serde_json::{Map, Value as JsonValue};

/// A GraphQL query or mutation ready to be sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub(crate) query: String,
    pub(crate) variables: Map<String, JsonValue>,
    pub(crate) operation_name: Option<String>,
    pub(crate) response_type: Option<String>,
}

impl Operation {
    /// Builds an operation from its document text.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
            response_type: None,
        }
    }

    /// Adds one variable. Names are sent as given, without a `$` prefix.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Adds every entry of a JSON object as a variable.
    ///
    /// Non-object values are ignored.
    pub fn variables(mut self, values: JsonValue) -> Self {
        if let JsonValue::Object(map) = values {
            self.variables.extend(map);
        }
        self
    }

    /// Selects the operation to run when the document holds several.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Asks the server for a specific response content type.
    pub fn response_type(mut self, content_type: impl Into<String>) -> Self {
        self.response_type = Some(content_type.into());
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn get_variables(&self) -> &Map<String, JsonValue> {
        &self.variables
    }

    pub fn get_operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    pub fn get_response_type(&self) -> Option<&str> {
        self.response_type.as_deref()
    }
}

impl From<&str> for Operation {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for Operation {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Operation;

    #[test]
    fn builder_collects_variables_and_name() {
        let op = Operation::new("query GetTables($first: Int) { getTables(first: $first) { edges { node { mcon } } } }")
            .variable("first", 10)
            .variables(json!({ "after": null, "ignored": "no" }))
            .variables(json!(["not", "an", "object"]))
            .operation_name("GetTables");

        assert_eq!(op.get_variables().len(), 3);
        assert_eq!(op.get_variables()["first"], json!(10));
        assert_eq!(op.get_operation_name(), Some("GetTables"));
        assert_eq!(op.get_response_type(), None);
    }
}
