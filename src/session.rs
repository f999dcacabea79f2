//! Credential and endpoint resolution.
//!
//! Resolution order for credentials:
//! 1. id/token passed to the builder, each falling back to
//!    `MCD_DEFAULT_API_ID` / `MCD_DEFAULT_API_TOKEN`;
//! 2. a profile section in `<config dir>/profiles.ini`, chosen by the
//!    builder, then `MCD_DEFAULT_PROFILE`, then `default`.
//!
//! Mixing environment credentials with a profile is not supported: when only
//! one of id/token is known the build fails.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::settings::{
    CONFIG_DIR_NAME, DEFAULT_API_ENDPOINT, DEFAULT_GATEWAY_ENDPOINT, DEFAULT_PROFILE_NAME,
    ENV_API_ENDPOINT, ENV_DEFAULT_API_ID, ENV_DEFAULT_API_TOKEN, ENV_DEFAULT_PROFILE, ENV_USER_ID,
    PROFILE_ENDPOINT_KEY, PROFILE_FILE_NAME, PROFILE_ID_KEY, PROFILE_TOKEN_KEY,
};
use crate::{McdError, Result};

/// Resolved credentials and endpoint for talking to the API.
#[derive(Clone)]
pub struct Session {
    id: String,
    token: String,
    session_name: String,
    endpoint: String,
    user_id: Option<String>,
    scope: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("session_name", &self.session_name)
            .field("endpoint", &self.endpoint)
            .field("user_id", &self.user_id)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Session {
    /// Creates a session from explicit credentials against the default
    /// GraphQL endpoint, ignoring the environment.
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
            session_name: new_session_name(),
            endpoint: DEFAULT_API_ENDPOINT.to_owned(),
            user_id: None,
            scope: None,
        }
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Replaces the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the acting-user id sent with every request.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Binds the session to a gateway scope. Scoped sessions can only make
    /// REST gateway calls.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// Name sent as the session header; stable for the session's lifetime.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

fn new_session_name() -> String {
    format!("rust-sdk-{}-{}", env!("CARGO_PKG_VERSION"), Uuid::new_v4())
}

/// Builder resolving a [`Session`] from arguments, environment and profile
/// file.
#[derive(Clone, Debug, Default)]
pub struct SessionBuilder {
    id: Option<String>,
    token: Option<String>,
    profile: Option<String>,
    config_path: Option<PathBuf>,
    endpoint: Option<String>,
    user_id: Option<String>,
    scope: Option<String>,
}

impl SessionBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Directory holding `profiles.ini`. Defaults to `$HOME/.mcd`.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Resolves the session using the process environment.
    pub fn build(self) -> Result<Session> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Resolves the session with `env` standing in for the process
    /// environment. Empty values count as unset.
    pub fn build_with_env<F>(self, env: F) -> Result<Session>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let session_name = new_session_name();
        tracing::info!(session_name = %session_name, "creating named session");

        let id = self.id.or_else(|| env(ENV_DEFAULT_API_ID));
        let token = self.token.or_else(|| env(ENV_DEFAULT_API_TOKEN));

        let (id, token, profile_endpoint) = match (id, token) {
            (Some(id), Some(token)) => (id, token, None),
            (None, None) => {
                let profile = self
                    .profile
                    .or_else(|| env(ENV_DEFAULT_PROFILE))
                    .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_owned());
                let dir = match self.config_path {
                    Some(path) => path,
                    None => env("HOME")
                        .map(|home| Path::new(&home).join(CONFIG_DIR_NAME))
                        .ok_or_else(|| {
                            McdError::Config(
                                "no credentials provided and HOME is not set".to_owned(),
                            )
                        })?,
                };
                let file = dir.join(PROFILE_FILE_NAME);
                tracing::info!(
                    profile = %profile,
                    path = %file.display(),
                    "no connection details provided, reading profile"
                );
                let mut values = read_profile(&file, &profile)?;
                let id = take_key(&mut values, PROFILE_ID_KEY, &profile, &file)?;
                let token = take_key(&mut values, PROFILE_TOKEN_KEY, &profile, &file)?;
                (id, token, values.remove(PROFILE_ENDPOINT_KEY))
            }
            _ => {
                return Err(McdError::InvalidSession(
                    "partially setting a session is not supported".to_owned(),
                ))
            }
        };

        let endpoint = match env(ENV_API_ENDPOINT).or(self.endpoint).or(profile_endpoint) {
            Some(endpoint) => endpoint,
            None if self.scope.is_some() => DEFAULT_GATEWAY_ENDPOINT.to_owned(),
            None => DEFAULT_API_ENDPOINT.to_owned(),
        };
        let user_id = self.user_id.or_else(|| env(ENV_USER_ID));

        let kind = if self.scope.is_some() {
            "GATEWAY_API"
        } else {
            "APPLICATION_API"
        };
        tracing::info!(api_id = %id, kind, "created session");

        Ok(Session {
            id,
            token,
            session_name,
            endpoint,
            user_id,
            scope: self.scope,
        })
    }
}

fn take_key(
    values: &mut HashMap<String, String>,
    key: &str,
    profile: &str,
    file: &Path,
) -> Result<String> {
    values.remove(key).ok_or_else(|| {
        McdError::Config(format!(
            "profile '{profile}' in '{}' is missing '{key}'",
            file.display()
        ))
    })
}

/// Reads one `[section]` of an INI file into key/value pairs. Keys are
/// lowercased; a missing file reads as having no sections.
fn read_profile(file: &Path, profile: &str) -> Result<HashMap<String, String>> {
    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(McdError::Config(format!(
                "cannot read '{}': {err}",
                file.display()
            )))
        }
    };

    let mut found = false;
    let mut in_section = false;
    let mut values = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            in_section = section.trim() == profile;
            found |= in_section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once(['=', ':']) {
            values.insert(key.trim().to_lowercase(), value.trim().to_owned());
        }
    }

    if !found {
        return Err(McdError::InvalidSession(format!(
            "profile '{profile}' not found in '{}'",
            file.display()
        )));
    }
    Ok(values)
}
