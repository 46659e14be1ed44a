//! # Ports
//!
//! Any storage adapter must implement these traits to be used by the services.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CommentRecord, PageId};

/// Persistence contract for a page's flat comment records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Durably stores a new record under the page's namespace.
    ///
    /// Must create-or-fail: an existing record with the same `guid` is never
    /// overwritten, and a failed write leaves nothing visible to `list`.
    async fn insert(&self, page: &PageId, record: &CommentRecord) -> Result<()>;

    /// Returns every decodable record of the page.
    ///
    /// Malformed records are skipped. A page without any comments yields an
    /// empty vector, not an error.
    async fn list(&self, page: &PageId) -> Result<Vec<CommentRecord>>;
}
