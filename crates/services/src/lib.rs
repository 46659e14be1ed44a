//! # services
//!
//! Business logic of the comment engine, written against the `domains` ports.
//! Nothing here touches the filesystem directly.

pub mod comment_store;
pub mod page_comments;
pub mod sanitize;
pub mod thread_builder;

pub use comment_store::{CommentStore, NewComment};
pub use page_comments::{
    CommentListing, CommentsMode, PageCommentService, PageComments, PageRequest, Submission,
    SubmissionOutcome, SubmissionReport,
};
