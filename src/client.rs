use std::fmt;

use reqwest::{header::HeaderMap, Method};
use serde_json::Value as JsonValue;

use crate::{
    backoff::Backoff,
    context::RequestContext,
    decode::{decode_reply, Classifier},
    retry::retry_with_backoff,
    settings::DEFAULT_GATEWAY_TIMEOUT,
    wire::GraphQlRequest,
    CallOptions, ClientOptions, McdError, Operation, Response, Result, Session,
};

#[derive(Clone)]
/// Client for the MCD GraphQL API and, for scoped sessions, its REST
/// gateway.
pub struct McdClient {
    http: reqwest::Client,
    session: Session,
    options: ClientOptions,
}

impl fmt::Debug for McdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McdClient")
            .field("session", &self.session)
            .field("options", &self.options)
            .finish()
    }
}

impl McdClient {
    /// Creates a client for an already resolved session.
    pub fn new(session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            session,
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from the default session resolution: environment
    /// variables, then the `default` profile in `$HOME/.mcd/profiles.ini`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcd_client::McdClient;
    ///
    /// let client = McdClient::from_env().expect("no MCD credentials configured");
    /// ```
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Session::builder().build()?))
    }

    /// Applies client options such as timeout, retry policies and error
    /// verbosity.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// API id of the current session, identifying the requester.
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Session name sent with every request for downstream tracing.
    pub fn session_name(&self) -> &str {
        self.session.session_name()
    }

    pub fn session_endpoint(&self) -> &str {
        self.session.endpoint()
    }

    /// Executes a query or mutation with the client's default policies.
    pub async fn execute(&self, operation: &Operation) -> Result<Response> {
        self.execute_with(operation, &CallOptions::default()).await
    }

    /// Executes an operation under an idempotency key.
    ///
    /// While the server reports that a request with this key is still
    /// running, the call polls with the idempotent retry policy instead of
    /// resubmitting blindly.
    pub async fn execute_idempotent(
        &self,
        operation: &Operation,
        idempotency_key: impl Into<String>,
    ) -> Result<Response> {
        let call = CallOptions::new().idempotency_key(idempotency_key);
        self.execute_with(operation, &call).await
    }

    /// Executes an operation with per-call overrides.
    ///
    /// Transient failures are retried with the call's (or client's) retry
    /// policy. With an idempotency key, an in-progress answer switches to
    /// polling under the idempotent policy; each poll gets a fresh retry
    /// sequence for transient failures.
    pub async fn execute_with(&self, operation: &Operation, call: &CallOptions) -> Result<Response> {
        if operation.query.trim().is_empty() {
            return Err(McdError::InvalidOperation(
                "operation text must not be empty".to_owned(),
            ));
        }
        if self.session.scope().is_some() {
            return Err(McdError::InvalidSession(
                "a session initialized with a scope cannot be used for GraphQL calls".to_owned(),
            ));
        }

        let ctx = RequestContext::new(
            &self.session,
            self.session.endpoint().to_owned(),
            call.timeout_ms.unwrap_or(self.options.timeout_ms),
            call.idempotency_key.as_deref(),
            operation.response_type.as_deref(),
        )?;
        tracing::info!(
            endpoint = %ctx.url,
            trace_id = %ctx.trace_id,
            session = %self.session.session_name(),
            idempotency_key = ctx.idempotency_key.as_deref().unwrap_or(""),
            "sending request"
        );

        let payload = GraphQlRequest::from(operation);
        let classifier = Classifier {
            idempotency_key: ctx.idempotency_key.as_deref(),
            in_progress_code: &self.options.in_progress_code,
        };
        let retry: &dyn Backoff = call.retry.as_deref().unwrap_or(&*self.options.retry);
        let attempt = || self.send_with_retry(&ctx, &payload, retry, classifier);

        let Some(key) = ctx.idempotency_key.as_deref() else {
            return attempt().await;
        };

        let poll: &dyn Backoff = call
            .idempotent_retry
            .as_deref()
            .unwrap_or(&*self.options.idempotent_retry);
        retry_with_backoff(
            "idempotent poll",
            poll,
            || {
                tracing::debug!(idempotency_key = key, trace_id = %ctx.trace_id, "sending idempotent request");
                attempt()
            },
            |err| matches!(err, McdError::RequestInProgress { .. }),
        )
        .await
    }

    /// Calls a REST endpoint of the integration gateway.
    ///
    /// Requires a session created with a scope. Returns `None` for an empty
    /// response body.
    pub async fn make_request(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>> {
        self.make_request_with(path, method, body, &CallOptions::default())
            .await
    }

    /// Calls a REST endpoint of the integration gateway with per-call
    /// overrides. Only `timeout_ms` and `retry` apply; the timeout defaults
    /// to the gateway's 10 seconds rather than the client timeout.
    pub async fn make_request_with(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
        call: &CallOptions,
    ) -> Result<Option<JsonValue>> {
        if self.session.scope().is_none() {
            return Err(McdError::InvalidSession(
                "a session initialized with a scope is required to call REST endpoints"
                    .to_owned(),
            ));
        }

        let ctx = RequestContext::new(
            &self.session,
            join_url(self.session.endpoint(), path),
            call.timeout_ms
                .unwrap_or(DEFAULT_GATEWAY_TIMEOUT.as_millis() as u64),
            None,
            None,
        )?;
        tracing::info!(
            url = %ctx.url,
            method = %method,
            trace_id = %ctx.trace_id,
            session = %self.session.session_name(),
            "sending gateway request"
        );

        let retry: &dyn Backoff = call.retry.as_deref().unwrap_or(&*self.options.retry);
        retry_with_backoff(
            "gateway request",
            retry,
            || self.send_gateway(&ctx, method.clone(), body),
            |err| match err {
                McdError::Http { status, .. } => *status == 429 || *status >= 500,
                other => other.is_retryable(),
            },
        )
        .await
    }

    async fn send_with_retry(
        &self,
        ctx: &RequestContext,
        payload: &GraphQlRequest<'_>,
        retry: &dyn Backoff,
        classifier: Classifier<'_>,
    ) -> Result<Response> {
        retry_with_backoff(
            "graphql request",
            retry,
            || self.send_once(ctx, payload, classifier),
            McdError::is_retryable,
        )
        .await
    }

    async fn send_once(
        &self,
        ctx: &RequestContext,
        payload: &GraphQlRequest<'_>,
        classifier: Classifier<'_>,
    ) -> Result<Response> {
        let response = self
            .http
            .post(&ctx.url)
            .headers(ctx.headers.clone())
            .timeout(ctx.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(trace_id = %ctx.trace_id, error = %err, "transport failure");
                McdError::Transport(err)
            })?;

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body = response.text().await.map_err(McdError::Transport)?;

        if !(200..300).contains(&status) {
            self.log_error_response(ctx, status, &headers, &body);
        }
        decode_reply(classifier, status, headers, body)
    }

    async fn send_gateway(
        &self,
        ctx: &RequestContext,
        method: Method,
        body: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>> {
        let mut request = self
            .http
            .request(method, &ctx.url)
            .headers(ctx.headers.clone())
            .timeout(ctx.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(McdError::Transport)?;
        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let text = response.text().await.map_err(McdError::Transport)?;

        if !(200..300).contains(&status) {
            self.log_error_response(ctx, status, &headers, &text);
            return Err(McdError::Http {
                status,
                body: text,
                headers,
            });
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| McdError::MalformedResponse {
                status,
                message: format!("invalid gateway response JSON: {err}"),
                body: text,
            })
    }

    fn log_error_response(
        &self,
        ctx: &RequestContext,
        status: u16,
        headers: &[(String, String)],
        body: &str,
    ) {
        // A gateway timeout on an idempotent request is expected; the poll
        // loop handles it.
        if !(status == 504 && ctx.idempotency_key.is_some()) {
            tracing::error!(url = %ctx.url, status, trace_id = %ctx.trace_id, "request failed");
        }
        if self.options.verbose_errors {
            tracing::info!(status, ?headers, body, "error response");
        } else {
            tracing::debug!(status, ?headers, body, "error response");
        }
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::{join_url, McdClient};
    use crate::{CallOptions, McdError, Operation, Session};

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://gw.example/", "/airflow/callbacks"),
            "https://gw.example/airflow/callbacks"
        );
        assert_eq!(join_url("https://gw.example", "x"), "https://gw.example/x");
    }

    #[test]
    fn debug_redacts_token() {
        let client = McdClient::new(Session::new("api-id", "secret-token"));
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn empty_operation_is_rejected_before_sending() {
        let client = McdClient::new(Session::new("a", "b").with_endpoint("http://127.0.0.1:9"));
        let err = client
            .execute(&Operation::new("   "))
            .await
            .expect_err("must fail");
        assert!(matches!(err, McdError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn scope_selects_between_graphql_and_gateway() {
        let scoped = McdClient::new(Session::new("a", "b").with_scope("AirflowCallbacks"));
        let err = scoped
            .execute(&Operation::new("{ getUser { email } }"))
            .await
            .expect_err("must fail");
        assert!(matches!(err, McdError::InvalidSession(_)));

        let unscoped = McdClient::new(Session::new("a", "b"));
        let err = unscoped
            .make_request("/airflow/callbacks", Method::POST, None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, McdError::InvalidSession(_)));
    }

    #[tokio::test]
    async fn gateway_timeout_override_is_validated() {
        let scoped = McdClient::new(Session::new("a", "b").with_scope("AirflowCallbacks"));
        let err = scoped
            .make_request_with(
                "/airflow/callbacks",
                Method::GET,
                None,
                &CallOptions::new().timeout_ms(0),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(err, McdError::Config(_)));
    }
}
