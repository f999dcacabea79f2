//! Case-normalizing access to GraphQL response data.
//!
//! The API answers in camelCase. [`Node::get`] compares keys after
//! converting both sides to snake_case, so `pageInfo`, `page_info` and
//! `PageInfo` all resolve to the same field. The underlying JSON is never
//! rewritten; [`Node::to_snake_case`] produces a converted copy when a typed
//! snake_case struct is wanted.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::{McdError, Result};

/// Successful result of a GraphQL operation: the `data` member of the
/// response envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    data: JsonValue,
}

impl Response {
    pub fn new(data: JsonValue) -> Self {
        Self { data }
    }

    /// Root view over `data`.
    pub fn data(&self) -> Node<'_> {
        Node(&self.data)
    }

    /// Looks up a top-level field of `data`.
    pub fn get(&self, key: &str) -> Option<Node<'_>> {
        self.data().get(key)
    }

    /// Follows a dot-separated path from the root, e.g.
    /// `"getTables.pageInfo.hasNextPage"`. Numeric segments index arrays.
    pub fn path(&self, path: &str) -> Option<Node<'_>> {
        self.data().path(path)
    }

    /// Deserializes `data` with keys converted to snake_case.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        self.data().deserialize()
    }

    /// Raw payload exactly as received.
    pub fn as_json(&self) -> &JsonValue {
        &self.data
    }

    pub fn into_json(self) -> JsonValue {
        self.data
    }
}

/// Borrowed view into a response value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node<'a>(&'a JsonValue);

impl<'a> Node<'a> {
    pub fn get(&self, key: &str) -> Option<Node<'a>> {
        let map = self.0.as_object()?;
        if let Some(value) = map.get(key) {
            return Some(Node(value));
        }
        let wanted = to_snake_case(key);
        map.iter()
            .find(|(name, _)| to_snake_case(name) == wanted)
            .map(|(_, value)| Node(value))
    }

    pub fn index(&self, index: usize) -> Option<Node<'a>> {
        self.0.as_array()?.get(index).map(Node)
    }

    pub fn path(&self, path: &str) -> Option<Node<'a>> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(*self, |node, segment| match segment.parse::<usize>() {
                Ok(index) if node.0.is_array() => node.index(index),
                _ => node.get(segment),
            })
    }

    /// Field names in snake_case.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .as_object()
            .map(|map| map.keys().map(|key| to_snake_case(key)).collect())
            .unwrap_or_default()
    }

    pub fn items(&self) -> Vec<Node<'a>> {
        self.0
            .as_array()
            .map(|items| items.iter().map(Node).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        match self.0 {
            JsonValue::Array(items) => items.len(),
            JsonValue::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.0.as_str()
    }

    pub fn as_json(&self) -> &'a JsonValue {
        self.0
    }

    /// Deep copy with every object key converted to snake_case.
    pub fn to_snake_case(&self) -> JsonValue {
        snake_case_keys(self.0)
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_snake_case())
            .map_err(|err| McdError::MalformedResponse {
                status: 200,
                body: self.0.to_string(),
                message: format!("response data does not match requested type: {err}"),
            })
    }
}

fn snake_case_keys(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(key, value)| (to_snake_case(key), snake_case_keys(value)))
                .collect::<Map<_, _>>(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(snake_case_keys).collect()),
        other => other.clone(),
    }
}

/// Converts `camelCase`, `PascalCase` and acronym runs (`HTTPStatus`) to
/// `snake_case`. Already snake_case input is returned unchanged.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::{to_snake_case, Response};

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("getTables"), "get_tables");
        assert_eq!(to_snake_case("hasNextPage"), "has_next_page");
        assert_eq!(to_snake_case("PageInfo"), "page_info");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
        assert_eq!(to_snake_case("tableId2Name"), "table_id2_name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("mcon"), "mcon");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn lookup_accepts_any_casing() {
        let response = Response::new(json!({
            "getTables": {
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
                "edges": [{ "node": { "fullTableId": "db:schema.t" } }]
            }
        }));

        let page_info = response.path("get_tables.page_info").expect("page info");
        assert_eq!(page_info.get("hasNextPage").and_then(|n| n.as_bool()), Some(true));
        assert_eq!(page_info.get("has_next_page").and_then(|n| n.as_bool()), Some(true));
        assert_eq!(page_info.get("EndCursor").and_then(|n| n.as_str()), Some("abc"));
        assert_eq!(
            response
                .path("getTables.edges.0.node.full_table_id")
                .and_then(|n| n.as_str()),
            Some("db:schema.t")
        );
        assert!(response.path("getTables.missing").is_none());
        assert_eq!(
            response.get("getTables").expect("root").keys(),
            vec!["edges".to_owned(), "page_info".to_owned()]
        );
    }

    #[test]
    fn snake_case_copy_preserves_every_leaf() {
        let data = json!({
            "getTables": {
                "edges": [
                    { "node": { "tableId": "t1", "rowCount": 12, "isMuted": false, "tags": ["a", "b"] } },
                    { "node": { "tableId": "t2", "rowCount": null, "isMuted": true, "tags": [] } }
                ],
                "pageInfo": { "hasNextPage": false, "ratio": 0.5 }
            }
        });
        let response = Response::new(data.clone());
        let converted = response.data().to_snake_case();

        assert_eq!(
            converted,
            json!({
                "get_tables": {
                    "edges": [
                        { "node": { "table_id": "t1", "row_count": 12, "is_muted": false, "tags": ["a", "b"] } },
                        { "node": { "table_id": "t2", "row_count": null, "is_muted": true, "tags": [] } }
                    ],
                    "page_info": { "has_next_page": false, "ratio": 0.5 }
                }
            })
        );
        assert_eq!(response.as_json(), &data);
    }

    #[test]
    fn deserialize_into_snake_case_struct() {
        #[derive(Debug, Deserialize)]
        struct PageInfo {
            has_next_page: bool,
            end_cursor: Option<String>,
        }

        let response = Response::new(json!({
            "getTables": { "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let page_info: PageInfo = response
            .path("getTables.pageInfo")
            .expect("page info")
            .deserialize()
            .expect("must deserialize");
        assert!(!page_info.has_next_page);
        assert!(page_info.end_cursor.is_none());
    }
}
