//! # page-comments
//!
//! Command-line host for the comment engine. Each invocation plays the part of
//! one page render: an optional submission, then the page's comment tree,
//! printed as JSON for whatever templating sits downstream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use configs::Settings;
use domains::PageId;
use services::page_comments::{FIELD_AUTHOR, FIELD_CONTENT, FIELD_HONEYPOT, FIELD_REPLY_GUID};
use services::{CommentsMode, PageCommentService, PageRequest, Submission};
use storage_adapters::FsCommentRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "page-comments", version, about = "Threaded, moderated page comments")]
struct Cli {
    /// Configuration file (defaults to ./page-comments.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visible comment tree of a page
    Show(PageArgs),
    /// Submit a comment to a page, then print its tree
    Post {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// guid of the comment being replied to
        #[arg(long)]
        reply_to: Option<String>,
        /// Origin address recorded with the comment
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
        /// Honeypot field; real visitors leave it empty
        #[arg(long, default_value = "")]
        website: String,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Page id, e.g. "blog/first-post"
    #[arg(long)]
    page: String,
    /// Value of the page's `comments` header ("enabled" allows submissions)
    #[arg(long, default_value = "enabled")]
    comments: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(&settings);
    info!(root = %settings.storage.root.display(), "configuration loaded");

    let repo = Arc::new(FsCommentRepository::new(settings.storage.root.clone()));
    let service = PageCommentService::new(repo, settings.policy());

    let (page, submission) = match cli.command {
        Command::Show(page) => (page, None),
        Command::Post {
            page,
            author,
            content,
            reply_to,
            ip,
            website,
        } => {
            let mut fields = vec![(FIELD_HONEYPOT, website.as_str())];
            if let Some(author) = &author {
                fields.push((FIELD_AUTHOR, author.as_str()));
            }
            if let Some(content) = &content {
                fields.push((FIELD_CONTENT, content.as_str()));
            }
            if let Some(reply_to) = &reply_to {
                fields.push((FIELD_REPLY_GUID, reply_to.as_str()));
            }
            (page, Some(Submission::from_form(fields, ip)))
        }
    };

    let request = PageRequest {
        page_id: PageId::parse(&page.page)?,
        mode: CommentsMode::from_header(Some(page.comments.as_str()))
            .context("page does not support comments")?,
        submission,
    };

    let result = service.handle(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.listing.thread().is_none() {
        anyhow::bail!("comment storage is unavailable");
    }
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
