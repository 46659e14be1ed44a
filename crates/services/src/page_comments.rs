//! # PageCommentService
//!
//! This module coordinates the flow between a page render and the comment
//! store: optional submission first, then always a fresh tree for display.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{CommentPolicy, CommentRepository, CommentThread, DomainError, PageId};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::comment_store::{CommentStore, NewComment};
use crate::thread_builder;

/// Form field names used by the comment form.
pub const FIELD_AUTHOR: &str = "comment_author";
pub const FIELD_CONTENT: &str = "comment_content";
pub const FIELD_REPLY_GUID: &str = "comment_replyguid";
/// Anti-spam field; hidden from humans, so anything in it came from a bot.
pub const FIELD_HONEYPOT: &str = "website";

/// What a page's metadata says about comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentsMode {
    /// Comments are shown and new ones may be submitted
    Open,
    /// Existing comments are shown, submissions are refused
    ReadOnly,
}

impl CommentsMode {
    /// Interprets the page's `comments` header. `None` means the page does not
    /// support comments at all and the service should not be invoked.
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None => None,
            Some("enabled") => Some(Self::Open),
            Some(_) => Some(Self::ReadOnly),
        }
    }
}

/// A comment form post, as received from the host.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub author: Option<String>,
    pub content: Option<String>,
    pub reply_guid: Option<String>,
    pub honeypot: Option<String>,
    pub origin_address: String,
}

impl Submission {
    /// Picks the comment fields out of decoded form pairs. Unknown fields are
    /// ignored and an empty reply target means "not a reply".
    pub fn from_form<'a>(
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
        origin_address: impl Into<String>,
    ) -> Self {
        let mut submission = Self {
            origin_address: origin_address.into(),
            ..Self::default()
        };
        for (key, value) in fields {
            match key {
                FIELD_AUTHOR => submission.author = Some(value.to_string()),
                FIELD_CONTENT => submission.content = Some(value.to_string()),
                FIELD_REPLY_GUID if !value.is_empty() => {
                    submission.reply_guid = Some(value.to_string())
                }
                FIELD_HONEYPOT => submission.honeypot = Some(value.to_string()),
                _ => {}
            }
        }
        submission
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page_id: PageId,
    pub mode: CommentsMode,
    pub submission: Option<Submission>,
}

/// User-facing result of a submission. Internal failure detail never leaks
/// past this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Submitted,
    Disabled,
    MissingFields,
    Rejected,
    ServerError,
}

impl SubmissionOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Submitted => "Comment submitted",
            Self::Disabled => "Comment submission is disabled on this page",
            Self::MissingFields => "Please fill out all required fields.",
            Self::Rejected => "Comment not submitted",
            Self::ServerError => "Server error",
        }
    }

    /// `0` on success, `1` otherwise.
    pub fn status(self) -> u8 {
        match self {
            Self::Submitted => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    pub message: &'static str,
    pub status: u8,
}

impl From<SubmissionOutcome> for SubmissionReport {
    fn from(outcome: SubmissionOutcome) -> Self {
        Self {
            outcome,
            message: outcome.message(),
            status: outcome.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommentListing {
    Ready(CommentThread),
    /// Storage could not be read; the page shows a server error instead
    Unavailable { message: &'static str },
}

impl CommentListing {
    pub fn thread(&self) -> Option<&CommentThread> {
        match self {
            Self::Ready(thread) => Some(thread),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Everything the templating layer needs for one page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageComments {
    pub submission: Option<SubmissionReport>,
    pub listing: CommentListing,
}

/// State shared across all requests.
#[derive(Clone)]
pub struct PageCommentService {
    store: CommentStore,
    policy: CommentPolicy,
}

impl PageCommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, policy: CommentPolicy) -> Self {
        Self {
            store: CommentStore::new(repo),
            policy,
        }
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    pub fn policy(&self) -> &CommentPolicy {
        &self.policy
    }

    pub async fn handle(&self, request: PageRequest) -> PageComments {
        self.handle_at(request, Utc::now()).await
    }

    /// Same as [`handle`](Self::handle) with an explicit server time for new comments.
    pub async fn handle_at(&self, request: PageRequest, now: DateTime<Utc>) -> PageComments {
        let page = &request.page_id;

        let submission = match request.submission {
            Some(submission) => Some(self.submit(page, request.mode, submission, now).await),
            None => None,
        };

        let listing = match self.store.list(page).await {
            Ok(records) => CommentListing::Ready(thread_builder::build(records)),
            Err(err) => {
                error!(page = %page, error = %err, "failed to load comments");
                CommentListing::Unavailable {
                    message: SubmissionOutcome::ServerError.message(),
                }
            }
        };

        PageComments {
            submission: submission.map(SubmissionReport::from),
            listing,
        }
    }

    async fn submit(
        &self,
        page: &PageId,
        mode: CommentsMode,
        submission: Submission,
        now: DateTime<Utc>,
    ) -> SubmissionOutcome {
        if mode != CommentsMode::Open {
            return SubmissionOutcome::Disabled;
        }

        // Bots get the same answer as humans, and nothing is stored.
        if submission.honeypot.as_deref().is_some_and(|v| !v.is_empty()) {
            info!(page = %page, origin = %submission.origin_address, "honeypot submission dropped");
            return SubmissionOutcome::Submitted;
        }

        let (Some(author), Some(content)) = (submission.author, submission.content) else {
            return SubmissionOutcome::MissingFields;
        };

        let comment = NewComment {
            author,
            content,
            reply_guid: submission.reply_guid,
            origin_address: submission.origin_address,
        };

        match self.store.create(page, comment, now, &self.policy).await {
            Ok(guid) => {
                info!(page = %page, guid = %guid, "comment submitted");
                SubmissionOutcome::Submitted
            }
            Err(DomainError::ValidationError(reason)) => {
                info!(page = %page, reason = %reason, "comment rejected");
                SubmissionOutcome::Rejected
            }
            Err(DomainError::DanglingReply(target)) => {
                warn!(page = %page, reply_guid = %target, "reply target does not exist");
                SubmissionOutcome::Rejected
            }
            Err(err) => {
                error!(page = %page, error = %err, "comment could not be stored");
                SubmissionOutcome::ServerError
            }
        }
    }
}
