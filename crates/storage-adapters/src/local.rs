//! # Local comment storage
//!
//! Filesystem implementation of `CommentRepository`.
//! Layout: `{root}/{page segments...}/{guid}.md`, one immutable file per comment.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{CommentRecord, CommentRepository, DomainError, PageId, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec;

const RECORD_EXTENSION: &str = "md";

pub struct FsCommentRepository {
    /// Root directory for all pages (e.g., "./blog-comments")
    root_path: PathBuf,
}

impl FsCommentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Directory holding every record of `page`.
    pub fn page_dir(&self, page: &PageId) -> PathBuf {
        let mut path = self.root_path.clone();
        for segment in page.segments() {
            path.push(segment);
        }
        path
    }
}

#[async_trait]
impl CommentRepository for FsCommentRepository {
    /// Writes the record to a hidden staging file, then hard-links it into
    /// place. The link refuses to replace an existing name, and readers only
    /// ever see a fully synced file under `{guid}.md`.
    async fn insert(&self, page: &PageId, record: &CommentRecord) -> Result<()> {
        if !is_safe_file_stem(&record.guid) {
            return Err(DomainError::ValidationError(format!(
                "guid {:?} cannot be used as a file name",
                record.guid
            )));
        }

        let dir = self.page_dir(page);
        fs::create_dir_all(&dir).await?;

        let target = dir.join(format!("{}.{}", record.guid, RECORD_EXTENSION));
        publish(&dir, &record.guid, &target, codec::encode(record).as_bytes()).await?;
        info!(page = %page, guid = %record.guid, pending = record.pending, "comment stored");
        Ok(())
    }

    async fn list(&self, page: &PageId) -> Result<Vec<CommentRecord>> {
        let dir = self.page_dir(page);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && is_record_file(&path) {
                paths.push(path);
            }
        }
        // Directory order is filesystem-defined; sort so reads are repeatable.
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let text = match fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "record vanished during scan");
                    continue;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable comment record");
                    continue;
                }
            };
            match codec::decode(&text) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed comment record");
                }
            }
        }

        debug!(page = %page, count = records.len(), "comment records loaded");
        Ok(records)
    }
}

/// Stages `bytes` next to `target` and links them into place. The staging
/// file is removed whether or not the link succeeded.
async fn publish(dir: &Path, stem: &str, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let staging = dir.join(format!(".{stem}.{}.tmp", Uuid::new_v4().simple()));
    let written = write_staged(&staging, target, bytes).await;

    if let Err(err) = fs::remove_file(&staging).await {
        if err.kind() != ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %err, "failed to remove staging file");
        }
    }
    written
}

async fn write_staged(staging: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::hard_link(staging, target).await
}

fn is_record_file(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| !name.starts_with('.'));
    visible && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
}

fn is_safe_file_stem(stem: &str) -> bool {
    !stem.is_empty()
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
