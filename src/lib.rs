//! `mcd-client` is an async GraphQL client core for the MCD
//! data-observability API.
//!
//! It sends one operation per call, attaches credential and correlation
//! headers, classifies transport and API failures, and retries them with a
//! pluggable backoff policy:
//! - [`McdClient::execute`]
//! - [`McdClient::execute_idempotent`]
//! - [`McdClient::execute_with`]
//! - [`McdClient::make_request`] and [`McdClient::make_request_with`] for the
//!   REST gateway
//!
//! Responses expose their camelCase payload through a case-normalizing
//! accessor ([`Response::path`], [`Node::get`]).

pub mod backoff;
mod client;
mod context;
mod decode;
mod error;
mod operation;
mod options;
mod response;
pub mod retry;
mod session;
pub mod settings;
mod wire;

pub use backoff::{Backoff, Delays, ExponentialBackoff, ExponentialBackoffJitter};
pub use client::McdClient;
pub use error::{GraphQlError, McdError};
pub use operation::Operation;
pub use options::{CallOptions, ClientOptions};
pub use reqwest::Method;
pub use response::{to_snake_case, Node, Response};
pub use retry::retry_with_backoff;
pub use session::{Session, SessionBuilder};

pub type Result<T> = std::result::Result<T, McdError>;
