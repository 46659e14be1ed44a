//! Shared fixtures for the end-to-end tests: a throwaway storage root wired to
//! the real filesystem adapter and services.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{CommentPolicy, PageId};
use services::{CommentStore, NewComment, PageCommentService};
use storage_adapters::FsCommentRepository;
use tempfile::TempDir;

pub struct Fixture {
    // Held so the directory outlives the test body.
    _root: TempDir,
    pub repo: Arc<FsCommentRepository>,
    pub service: PageCommentService,
    pub page: PageId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(CommentPolicy::default())
    }

    pub fn with_policy(policy: CommentPolicy) -> Self {
        let root = TempDir::new().expect("create temp storage root");
        let repo = Arc::new(FsCommentRepository::new(root.path()));
        let service = PageCommentService::new(repo.clone(), policy);
        Self {
            _root: root,
            repo,
            service,
            page: PageId::parse("blog/hello-world").expect("valid page id"),
        }
    }

    pub fn store(&self) -> &CommentStore {
        self.service.store()
    }

    pub fn policy(&self) -> CommentPolicy {
        *self.service.policy()
    }

    pub fn page_dir(&self) -> PathBuf {
        self.repo.page_dir(&self.page)
    }

    /// Names of every entry in the page directory, sorted; empty if absent.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.page_dir()) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Creates a comment at a fixed server time and returns its guid.
    pub async fn post(&self, author: &str, content: &str, reply_to: Option<&str>, secs: i64) -> String {
        self.store()
            .create(&self.page, comment(author, content, reply_to), at(secs), &self.policy())
            .await
            .expect("comment should be created")
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn comment(author: &str, content: &str, reply_to: Option<&str>) -> NewComment {
    NewComment {
        author: author.to_string(),
        content: content.to_string(),
        reply_guid: reply_to.map(String::from),
        origin_address: "192.0.2.10".to_string(),
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).expect("timestamp in range")
}
