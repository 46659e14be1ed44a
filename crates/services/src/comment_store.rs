//! # CommentStore
//!
//! Creation and listing of a page's comment records. All checks run before
//! the repository is asked to write, so a refused comment has no side effect.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{
    CommentPolicy, CommentRecord, CommentRepository, DomainError, PageId, Result, MAX_REPLY_DEPTH,
};
use tracing::debug;

use crate::sanitize::{sanitize_author, sanitize_content};

/// Raw, unsanitized input for a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: String,
    pub content: String,
    pub reply_guid: Option<String>,
    pub origin_address: String,
}

#[derive(Clone)]
pub struct CommentStore {
    repo: Arc<dyn CommentRepository>,
}

impl CommentStore {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Validates and persists a comment, returning its new `guid`.
    pub async fn create(
        &self,
        page: &PageId,
        comment: NewComment,
        now: DateTime<Utc>,
        policy: &CommentPolicy,
    ) -> Result<String> {
        let author = sanitize_author(&comment.author)?;
        let content = sanitize_content(&comment.content)?;

        let length = content.len();
        if length > policy.size_limit {
            return Err(DomainError::ValidationError(format!(
                "content is {length} bytes, limit is {}",
                policy.size_limit
            )));
        }

        if let Some(target) = &comment.reply_guid {
            let existing = self.repo.list(page).await?;
            if !existing.iter().any(|record| &record.guid == target) {
                return Err(DomainError::DanglingReply(target.clone()));
            }
            if reply_depth(target, &existing) >= MAX_REPLY_DEPTH {
                return Err(DomainError::ValidationError(format!(
                    "replies nest at most {MAX_REPLY_DEPTH} levels deep"
                )));
            }
        }

        let record = CommentRecord {
            guid: new_guid()?,
            reply_guid: comment.reply_guid,
            author,
            content,
            created_at: now,
            remote_address: comment
                .origin_address
                .chars()
                .filter(|c| !c.is_control())
                .collect(),
            pending: policy.review_enabled,
        };

        self.repo.insert(page, &record).await?;
        debug!(page = %page, guid = %record.guid, "comment created");
        Ok(record.guid)
    }

    pub async fn list(&self, page: &PageId) -> Result<Vec<CommentRecord>> {
        self.repo.list(page).await
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn new_guid() -> Result<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes)
        .map_err(|err| DomainError::Io(io::Error::other(err.to_string())))?;
    Ok(hex::encode(bytes))
}

/// Nesting level of `guid`, following parent links until a top-level or
/// unknown record. Stops counting past the limit, so reference cycles end.
fn reply_depth(guid: &str, records: &[CommentRecord]) -> usize {
    let parents: HashMap<&str, Option<&str>> = records
        .iter()
        .map(|record| (record.guid.as_str(), record.reply_guid.as_deref()))
        .collect();

    let mut depth = 0;
    let mut current = guid;
    while let Some(Some(parent)) = parents.get(current) {
        depth += 1;
        if depth > MAX_REPLY_DEPTH {
            break;
        }
        current = parent;
    }
    depth
}
