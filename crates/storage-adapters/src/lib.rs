//! # storage-adapters
//!
//! Persistence adapters implementing the `domains` ports.
//! The `comments-fs` feature (default) stores each comment as a flat text file.

pub mod codec;

#[cfg(feature = "comments-fs")]
pub mod local;

#[cfg(feature = "comments-fs")]
pub use local::FsCommentRepository;
