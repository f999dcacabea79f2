use serde_json::Value as JsonValue;

use crate::{
    error::GraphQlError,
    settings::REQUEST_TIMEOUT_CODE,
    wire::{GraphQlEnvelope, WireError},
    McdError, Response, Result,
};

/// What the client needs to know to decide how a reply is classified.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Classifier<'a> {
    /// Set when the call carries an idempotency key; enables in-progress
    /// detection.
    pub idempotency_key: Option<&'a str>,
    pub in_progress_code: &'a str,
}

/// Turns one HTTP reply into a [`Response`] or a typed error.
pub(crate) fn decode_reply(
    classifier: Classifier<'_>,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
) -> Result<Response> {
    let parsed = serde_json::from_str::<JsonValue>(&body).ok();

    if !(200..300).contains(&status) {
        let Some(value) = parsed else {
            return Err(McdError::Http {
                status,
                body,
                headers,
            });
        };
        let mut envelope =
            serde_json::from_value::<GraphQlEnvelope>(value.clone()).unwrap_or_default();
        if let Some(errors) = envelope.errors.take().filter(has_errors) {
            return Err(decode_graphql_errors(classifier, errors, status, headers));
        }
        let message = envelope
            .message_text()
            .unwrap_or_else(|| format!("request failed with HTTP status {status}"));
        return Err(McdError::GraphQl(GraphQlError {
            code: None,
            summary: message.clone(),
            message,
            status,
            retryable: status >= 500,
            body: value,
            headers,
        }));
    }

    let Some(value) = parsed else {
        return Err(McdError::MalformedResponse {
            status,
            body,
            message: "response body is not JSON".to_owned(),
        });
    };
    let envelope = match serde_json::from_value::<GraphQlEnvelope>(value) {
        Ok(envelope) => envelope,
        Err(err) => {
            return Err(McdError::MalformedResponse {
                status,
                body,
                message: format!("response is not a GraphQL envelope: {err}"),
            })
        }
    };

    if let Some(errors) = envelope.errors.filter(has_errors) {
        return Err(decode_graphql_errors(classifier, errors, status, headers));
    }

    match envelope.data {
        Some(data) if !data.is_null() => Ok(Response::new(data)),
        _ => Err(McdError::MalformedResponse {
            status,
            body,
            message: "response has neither data nor errors".to_owned(),
        }),
    }
}

fn has_errors(errors: &JsonValue) -> bool {
    match errors {
        JsonValue::Null => false,
        JsonValue::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn wire_errors(errors: &JsonValue) -> Vec<WireError> {
    let lenient = |value: &JsonValue| {
        serde_json::from_value::<WireError>(value.clone()).unwrap_or_else(|_| WireError {
            message: Some(value.clone()),
            ..WireError::default()
        })
    };
    match errors {
        JsonValue::Array(items) => items.iter().map(lenient).collect(),
        other => vec![lenient(other)],
    }
}

fn decode_graphql_errors(
    classifier: Classifier<'_>,
    errors: JsonValue,
    status: u16,
    headers: Vec<(String, String)>,
) -> McdError {
    let items = wire_errors(&errors);
    for (index, item) in items.iter().enumerate() {
        tracing::debug!(
            index,
            path = item.path_text().as_deref().unwrap_or(""),
            code = item.code().unwrap_or(""),
            message = %item.message_text(),
            "graphql error"
        );
    }

    let message = items
        .iter()
        .map(WireError::message_text)
        .collect::<Vec<_>>()
        .join("\n");
    let first = items.first();
    let code = first.and_then(WireError::code).map(str::to_owned);
    let summary = match items.len() {
        0 | 1 => message.clone(),
        count => format!(
            "{} (and {} more errors)",
            first.map(WireError::message_text).unwrap_or_default(),
            count - 1
        ),
    };

    if let (Some(key), Some(code)) = (classifier.idempotency_key, code.as_deref()) {
        if code == classifier.in_progress_code {
            return McdError::RequestInProgress {
                idempotency_key: key.to_owned(),
                error: GraphQlError {
                    code: Some(code.to_owned()),
                    summary,
                    message,
                    status,
                    retryable: false,
                    body: errors,
                    headers,
                },
            };
        }
    }

    let retryable = if code.as_deref() == Some(REQUEST_TIMEOUT_CODE) {
        tracing::warn!(status, "graphql request timed out upstream");
        true
    } else {
        let explicit = first.and_then(WireError::retryable);
        tracing::warn!(status, count = items.len(), "graphql request failed");
        explicit.unwrap_or(status >= 500)
    };

    McdError::GraphQl(GraphQlError {
        code,
        summary,
        message,
        status,
        retryable,
        body: errors,
        headers,
    })
}
