//! # Domain Models
//!
//! These structs represent the core entities of the comment engine.
//! A `CommentRecord` is what lives on disk; a `CommentNode` is the
//! derived, in-memory reply tree handed to the rendering layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DomainError, Result};

/// Identifies the comment namespace of a single page (e.g. "blog/first-post").
///
/// Segments are joined onto the storage root, so anything that could walk out
/// of it is refused at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with('/') {
            return Err(DomainError::InvalidPageId(raw.to_string()));
        }
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DomainError::InvalidPageId("empty page id".into()));
        }
        if trimmed.chars().any(|c| c == '\\' || c.is_control()) {
            return Err(DomainError::InvalidPageId(raw.to_string()));
        }
        if trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidPageId(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, in order, for building the on-disk directory.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fundamental persisted unit: one comment, one file.
///
/// Only `guid`, `author`, `content` and `created_at` are ever serialized for
/// rendering. `remote_address` is kept for administrative use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub guid: String,
    /// The `guid` of the comment this one replies to, if any
    #[serde(skip)]
    pub reply_guid: Option<String>,
    pub author: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub remote_address: String,
    /// Awaiting moderation; hidden from every read path while set
    #[serde(skip)]
    pub pending: bool,
}

/// A record plus its approved direct replies, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub record: CommentRecord,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(record: CommentRecord) -> Self {
        Self {
            record,
            replies: Vec::new(),
        }
    }

    pub fn guid(&self) -> &str {
        &self.record.guid
    }
}

/// The visible reply tree of a page together with its approved comment count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    pub comments: Vec<CommentNode>,
    pub approved_count: usize,
}

/// Deepest reply level kept in a thread; top-level comments sit at level 0.
pub const MAX_REPLY_DEPTH: usize = 64;

/// Sitewide rules applied when a new comment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentPolicy {
    /// Maximum content length, counted in bytes of the sanitized (escaped) text
    pub size_limit: usize,
    /// New comments are stored as pending until cleared by a moderator
    pub review_enabled: bool,
}

impl Default for CommentPolicy {
    fn default() -> Self {
        Self {
            size_limit: 2000,
            review_enabled: false,
        }
    }
}
