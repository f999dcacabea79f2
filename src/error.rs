use std::fmt;

use serde_json::Value as JsonValue;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum McdError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Error reported by the GraphQL API, either in a 200 envelope or in a
    /// JSON error body.
    #[error("graphql error: {0}")]
    GraphQl(GraphQlError),
    /// The server is still running an earlier submission with the same
    /// idempotency key. `error` is the decoded in-progress reply.
    #[error("idempotent request {idempotency_key} still in progress: {error}")]
    RequestInProgress {
        idempotency_key: String,
        error: GraphQlError,
    },
    /// Non-success HTTP status code whose body is not JSON.
    #[error("http error {status}: {body}")]
    Http {
        status: u16,
        body: String,
        headers: Vec<(String, String)>,
    },
    /// Success status whose body is not a usable GraphQL envelope.
    #[error("malformed response (status {status}): {message}; body: {body}")]
    MalformedResponse {
        status: u16,
        body: String,
        message: String,
    },
    /// The operation cannot be sent as built.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// The session cannot be used for the requested kind of call.
    #[error("invalid session: {0}")]
    InvalidSession(String),
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl McdError {
    /// Whether the standard retry policy may resend the request.
    ///
    /// `RequestInProgress` is not retryable here: only the idempotent poll
    /// loop waits on it.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => is_retryable_transport(err),
            Self::GraphQl(err) => err.retryable,
            Self::RequestInProgress { .. }
            | Self::Http { .. }
            | Self::MalformedResponse { .. }
            | Self::InvalidOperation(_)
            | Self::InvalidSession(_)
            | Self::Config(_) => false,
        }
    }

    /// Machine-readable error code, when the server supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::GraphQl(err) | Self::RequestInProgress { error: err, .. } => err.code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::GraphQl(err) | Self::RequestInProgress { error: err, .. } => Some(err.status),
            Self::Http { status, .. } | Self::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// Application-level error record decoded from a GraphQL `errors` array.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQlError {
    /// `extensions.code` of the first error.
    pub code: Option<String>,
    /// All error messages joined by newlines.
    pub message: String,
    /// One-line description suitable for logs.
    pub summary: String,
    /// HTTP status the envelope arrived with.
    pub status: u16,
    pub retryable: bool,
    /// Raw `errors` value (or the whole body when no `errors` key exists).
    pub body: JsonValue,
    pub headers: Vec<(String, String)>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GraphQlError, McdError};

    fn graphql(status: u16, retryable: bool) -> GraphQlError {
        GraphQlError {
            code: Some("SOME_CODE".to_owned()),
            message: "boom".to_owned(),
            summary: "boom".to_owned(),
            status,
            retryable,
            body: json!([{ "message": "boom" }]),
            headers: Vec::new(),
        }
    }

    #[test]
    fn graphql_error_exposes_code_status_and_flag() {
        let err = McdError::GraphQl(graphql(502, true));
        assert!(err.is_retryable());
        assert_eq!(err.code(), Some("SOME_CODE"));
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "graphql error: boom");
    }

    #[test]
    fn in_progress_and_malformed_are_not_retryable() {
        let in_progress = McdError::RequestInProgress {
            idempotency_key: "abc".to_owned(),
            error: graphql(202, false),
        };
        let malformed = McdError::MalformedResponse {
            status: 200,
            body: "<html>".to_owned(),
            message: "not json".to_owned(),
        };
        let http = McdError::Http {
            status: 503,
            body: "down".to_owned(),
            headers: Vec::new(),
        };
        assert!(!in_progress.is_retryable());
        assert_eq!(in_progress.code(), Some("SOME_CODE"));
        assert_eq!(in_progress.status(), Some(202));
        assert!(!malformed.is_retryable());
        assert!(!http.is_retryable());
        assert_eq!(http.status(), Some(503));
    }
}
