//! Collaborator interfaces consumed by the workflow controller.

use async_trait::async_trait;
use formkit_core::{Record, ServiceError};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persists business objects.
#[async_trait]
pub trait EntityService: Send + Sync {
    /// Create or update `entity`; resolves once with the stored entity.
    async fn update(&self, entity: Record) -> Result<Record, ServiceError>;

    /// Reject a pending change proposal with the reviewer's note.
    async fn reject_proposal(&self, proposal_id: &str, note: &str) -> Result<(), ServiceError>;
}

/// Translation lookup.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translated text for `key`; unknown keys come back unchanged.
    async fn lookup(&self, key: &str) -> String;

    /// Translated text for `key`, re-emitted whenever the language changes.
    fn watch(&self, key: &str) -> BoxStream<'static, String>;
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
            NotificationLevel::Success => "success",
        };
        f.write_str(s)
    }
}

/// Toast / notification sink.
pub trait NotificationSink: Send + Sync {
    fn show(&self, level: NotificationLevel, message_key: &str, params: &[String]);
}
