//! Contracts for the external collaborators the pipeline consumes.
//!
//! Implementations live outside this crate (SharePoint connector, SQL
//! gateway, HTTP image fetcher); tests drive the pipeline through in-memory
//! fakes of these traits.

use async_trait::async_trait;
use serde_json::Value;

/// Query options for a record-source list fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub top: Option<u32>,
    pub expand: Option<String>,
}

impl ListQuery {
    pub fn filtered(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

/// Failure modes shared by the collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("no matching row")]
    NotFound,
}

/// Raw heterogeneous record access (SharePoint list or relational query).
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_items(&self, list: &str, query: &ListQuery) -> Result<Vec<Value>, SourceError>;
}

/// Persistent pass/fail settings keyed by schema and, optionally, section.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn passing_grade(
        &self,
        schema_id: &str,
        section_id: Option<&str>,
    ) -> Result<Option<f64>, SourceError>;
}

/// Authenticated image retrieval for remote picture references.
#[async_trait]
pub trait PictureSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}
