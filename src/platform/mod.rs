//! Contracts for everything the usage statistics depend on but don't own: the usage access
//! grant, the usage event log and application labels. The file backed realizations live in the
//! submodules, tests substitute them with mocks.

pub mod access;
pub mod event_log;
pub mod labels;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::usage::entities::{UsageEvent, UsageWindow};

/// Controls whether the process is allowed to read usage events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageAccess: Send + Sync {
    async fn has_permission(&self) -> Result<bool>;

    /// Opens the place where the user can grant usage access. The result only tells whether it
    /// was opened, the grant itself may come much later or never.
    async fn request_permission(&self) -> Result<bool>;
}

/// Provider of usage events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageEventSource: Send + Sync {
    /// Returns events inside `window` in chronological order.
    async fn query_events(&self, window: UsageWindow) -> Result<Vec<UsageEvent>>;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    #[error("no label known for {0}")]
    NotFound(String),
    #[error("label catalog unavailable: {message}")]
    Catalog { message: String },
}

/// Maps application identifiers to names a person can recognize.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelResolver: Send + Sync {
    async fn resolve_label(&self, application_id: &str) -> Result<String, LabelError>;
}
