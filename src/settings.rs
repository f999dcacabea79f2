//! Protocol constants and defaults shared by the client and session.

use std::time::Duration;

/// Default GraphQL endpoint when neither the environment nor a profile
/// provides one.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.getmontecarlo.com/graphql";
/// Default REST gateway endpoint for scoped sessions.
pub const DEFAULT_GATEWAY_ENDPOINT: &str = "https://integrations.getmontecarlo.com";

pub const API_ID_HEADER: &str = "x-mcd-id";
pub const API_TOKEN_HEADER: &str = "x-mcd-token";
pub const USER_ID_HEADER: &str = "user-id";
pub const SESSION_ID_HEADER: &str = "x-mcd-session-id";
pub const TRACE_ID_HEADER: &str = "x-mcd-trace-id";
pub const IDEMPOTENT_ID_HEADER: &str = "x-mcd-idempotent-id";
pub const RESPONSE_CONTENT_TYPE_HEADER: &str = "x-mcd-response-content-type";

/// Error code the API returns while an idempotent request is still running.
pub const DEFAULT_IN_PROGRESS_CODE: &str = "REQUEST_IN_PROGRESS";
/// Error code the API returns when the upstream operation timed out.
pub const REQUEST_TIMEOUT_CODE: &str = "REQUEST_TIMEOUT";

pub const ENV_API_ENDPOINT: &str = "MCD_API_ENDPOINT";
pub const ENV_DEFAULT_PROFILE: &str = "MCD_DEFAULT_PROFILE";
pub const ENV_DEFAULT_API_ID: &str = "MCD_DEFAULT_API_ID";
pub const ENV_DEFAULT_API_TOKEN: &str = "MCD_DEFAULT_API_TOKEN";
pub const ENV_USER_ID: &str = "MCD_USER_ID_HEADER";

pub const PROFILE_FILE_NAME: &str = "profiles.ini";
pub const DEFAULT_PROFILE_NAME: &str = "default";
pub const CONFIG_DIR_NAME: &str = ".mcd";
pub const PROFILE_ID_KEY: &str = "mcd_id";
pub const PROFILE_TOKEN_KEY: &str = "mcd_token";
pub const PROFILE_ENDPOINT_KEY: &str = "mcd_api_endpoint";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_RETRY_INITIAL_WAIT: Duration = Duration::from_millis(250);
pub const DEFAULT_RETRY_MAX_WAIT: Duration = Duration::from_secs(10);

// 4s doubling to a 64s ceiling: five polls, about two minutes of waiting.
pub const DEFAULT_IDEMPOTENT_RETRY_INITIAL_WAIT: Duration = Duration::from_secs(4);
pub const DEFAULT_IDEMPOTENT_RETRY_MAX_WAIT: Duration = Duration::from_secs(64);
