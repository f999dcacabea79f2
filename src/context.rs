use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::settings::{
    API_ID_HEADER, API_TOKEN_HEADER, IDEMPOTENT_ID_HEADER, RESPONSE_CONTENT_TYPE_HEADER,
    SESSION_ID_HEADER, TRACE_ID_HEADER, USER_ID_HEADER,
};
use crate::{McdError, Result, Session};

/// Per-call request metadata.
///
/// Built once per logical call; every retry and poll of that call reuses it,
/// so all physical attempts share one trace id.
#[derive(Debug)]
pub(crate) struct RequestContext {
    pub url: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub trace_id: String,
    pub idempotency_key: Option<String>,
}

impl RequestContext {
    pub fn new(
        session: &Session,
        url: String,
        timeout_ms: u64,
        idempotency_key: Option<&str>,
        response_type: Option<&str>,
    ) -> Result<Self> {
        if timeout_ms == 0 {
            return Err(McdError::Config("timeout must be positive".to_owned()));
        }

        let trace_id = Uuid::new_v4().to_string();
        let mut headers = HeaderMap::new();
        insert(&mut headers, API_ID_HEADER, session.id())?;
        insert(&mut headers, API_TOKEN_HEADER, session.token())?;
        insert(&mut headers, SESSION_ID_HEADER, session.session_name())?;
        insert(&mut headers, TRACE_ID_HEADER, &trace_id)?;
        if let Some(user_id) = session.user_id() {
            insert(&mut headers, USER_ID_HEADER, user_id)?;
        }
        if let Some(key) = idempotency_key {
            insert(&mut headers, IDEMPOTENT_ID_HEADER, key)?;
        }
        if let Some(content_type) = response_type {
            insert(&mut headers, RESPONSE_CONTENT_TYPE_HEADER, content_type)?;
        }

        Ok(Self {
            url,
            headers,
            timeout: Duration::from_millis(timeout_ms),
            trace_id,
            idempotency_key: idempotency_key.map(str::to_owned),
        })
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| McdError::Config(format!("value for header '{name}' is not valid")))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::RequestContext;
    use crate::{McdError, Session};

    #[test]
    fn headers_carry_credentials_and_correlation_ids() {
        let session = Session::new("api-id", "api-token").with_user_id("user-1");
        let ctx = RequestContext::new(
            &session,
            session.endpoint().to_owned(),
            5_000,
            Some("idem-1"),
            Some("application/json"),
        )
        .expect("must build");

        assert_eq!(ctx.headers["x-mcd-id"], "api-id");
        assert_eq!(ctx.headers["x-mcd-token"], "api-token");
        assert_eq!(ctx.headers["x-mcd-session-id"], session.session_name());
        assert_eq!(ctx.headers["x-mcd-trace-id"], ctx.trace_id.as_str());
        assert_eq!(ctx.headers["user-id"], "user-1");
        assert_eq!(ctx.headers["x-mcd-idempotent-id"], "idem-1");
        assert_eq!(ctx.headers["x-mcd-response-content-type"], "application/json");
    }

    #[test]
    fn optional_headers_are_omitted_and_trace_ids_differ_per_call() {
        let session = Session::new("api-id", "api-token");
        let first = RequestContext::new(&session, "http://x".to_owned(), 1, None, None)
            .expect("must build");
        let second = RequestContext::new(&session, "http://x".to_owned(), 1, None, None)
            .expect("must build");

        assert!(!first.headers.contains_key("user-id"));
        assert!(!first.headers.contains_key("x-mcd-idempotent-id"));
        assert_ne!(first.trace_id, second.trace_id);
        assert_eq!(
            first.headers["x-mcd-session-id"],
            second.headers["x-mcd-session-id"]
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let session = Session::new("a", "b");
        let err = RequestContext::new(&session, "http://x".to_owned(), 0, None, None)
            .expect_err("must fail");
        assert!(matches!(err, McdError::Config(_)));
    }
}
