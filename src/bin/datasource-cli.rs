#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for pulling items from a mailbox or a local folder

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use data_sources::{
    AttachmentItem, AttachmentKey, DataSource, DateRange, FileDataSource, FileItem, ItemStream,
    MailboxConfig, MailboxDataSource, Paging, RetrievedItem,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datasource-cli")]
#[command(about = "Pull items from a mailbox or a local folder")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Mail attachments, configured through `GRAPH_*` and `MAILBOX_*`
    /// environment variables
    Mail {
        #[command(subcommand)]
        action: MailAction,
    },

    /// Files of a local folder
    Files {
        /// Folder to read from
        #[arg(long)]
        folder: PathBuf,

        #[command(subcommand)]
        action: FilesAction,
    },
}

#[derive(Subcommand)]
enum MailAction {
    /// List items received inside a date window
    Items(Window),

    /// Fetch a single attachment
    Item {
        message_id: String,
        attachment_id: String,
    },

    /// List every item of one message
    Message { message_id: String },

    /// Check that the credentials and folder work
    Probe,
}

#[derive(Subcommand)]
enum FilesAction {
    /// List files modified inside a date window
    Items(Window),

    /// Read a single file
    Item { path: String },

    /// Check that the folder is readable
    Probe,
}

#[derive(clap::Args)]
struct Window {
    /// Exclusive lower bound (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    from: Option<DateTime<Utc>>,

    /// Exclusive upper bound (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    to: Option<DateTime<Utc>>,

    /// Zero-based page number
    #[arg(long, requires = "page_size")]
    page: Option<usize>,

    /// Items per page; all items when omitted
    #[arg(long)]
    page_size: Option<usize>,
}

impl Window {
    fn range(&self) -> Option<DateRange> {
        let range = DateRange::new(self.from, self.to);
        (!range.is_unbounded()).then_some(range)
    }

    fn paging(&self) -> data_sources::Result<Option<Paging>> {
        self.page_size
            .map(|size| Paging::new(self.page.unwrap_or_default(), size))
            .transpose()
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|e| format!("Invalid date '{s}': {e}"))
}

/// One output row.
#[derive(Serialize)]
struct Summary {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    name: String,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

trait Summarize {
    fn summary(&self) -> Summary;
}

impl Summarize for AttachmentItem {
    fn summary(&self) -> Summary {
        Summary {
            key: self.key().attachment_id.clone(),
            message_id: Some(self.key().message_id.clone()),
            name: self.file_name().to_string(),
            size: self.content().len(),
            sender: Some(self.sender().to_string()),
            subject: Some(self.subject().to_string()),
            timestamp: self.received(),
        }
    }
}

impl Summarize for FileItem {
    fn summary(&self) -> Summary {
        Summary {
            key: self.key().to_string(),
            message_id: None,
            name: self
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: self.content().len(),
            sender: None,
            subject: None,
            timestamp: self.modified(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Mail { action } => {
            let source = MailboxDataSource::new(MailboxConfig::from_env()?)?;
            cmd_mail(&source, action, cli.json).await?;
        }
        Command::Files { folder, action } => {
            let source = FileDataSource::new("files", folder.clone())?;
            cmd_files(&source, action, cli.json).await?;
        }
    }

    Ok(())
}

async fn cmd_mail(
    source: &MailboxDataSource,
    action: &MailAction,
    json: bool,
) -> anyhow::Result<()> {
    match action {
        MailAction::Items(window) => {
            let items = source.get_items(window.range(), window.paging()?);
            print_summaries(&collect(items).await?, json)
        }
        MailAction::Item {
            message_id,
            attachment_id,
        } => {
            let key = AttachmentKey::new(message_id.as_str(), attachment_id.as_str());
            let item = source.get_item(&key).await?;
            print_summaries(&[item.summary()], json)
        }
        MailAction::Message { message_id } => {
            let items = source.get_message_items(message_id)?;
            print_summaries(&collect(items).await?, json)
        }
        MailAction::Probe => {
            source.test_authentication().await?;
            println!("Mailbox '{}' is reachable", source.name());
            Ok(())
        }
    }
}

async fn cmd_files(
    source: &FileDataSource,
    action: &FilesAction,
    json: bool,
) -> anyhow::Result<()> {
    match action {
        FilesAction::Items(window) => {
            let items = source.get_items(window.range(), window.paging()?);
            print_summaries(&collect(items).await?, json)
        }
        FilesAction::Item { path } => {
            let item = source.get_item(path.as_str()).await?;
            print_summaries(&[item.summary()], json)
        }
        FilesAction::Probe => {
            source.test_authentication().await?;
            println!(
                "Folder '{}' is readable",
                source.local_folder().display()
            );
            Ok(())
        }
    }
}

async fn collect<T: Summarize>(mut items: ItemStream<'_, T>) -> anyhow::Result<Vec<Summary>> {
    let mut summaries = Vec::new();
    while let Some(item) = items.try_next().await? {
        summaries.push(item.summary());
    }
    Ok(summaries)
}

fn print_summaries(summaries: &[Summary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    let header = format!("{:<20} {:<30} {:>10} {}", "Date", "Name", "Size", "Key");
    println!("{header}");
    println!("{}", "-".repeat(100));

    for summary in summaries {
        println!(
            "{:<20} {:<30} {:>10} {}",
            summary
                .timestamp
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            truncate(&summary.name, 28),
            summary.size,
            summary.key,
        );
    }

    println!("\n{} item(s)", summaries.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
