//! CLI for the vgq scrape-and-download queue.

mod commands;
mod event_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vgq_core::config;
use vgq_core::queue::{Destination, JobStore};

use commands::{run_add, run_queue, run_remove, run_requeue, run_status, run_watch};

/// Top-level CLI for the vgq queue.
#[derive(Debug, Parser)]
#[command(name = "vgq")]
#[command(about = "vgq: proxy-rotating video scrape-and-download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

fn parse_destination(s: &str) -> Result<Destination, String> {
    match s {
        "siteA" | "sitea" | "a" => Ok(Destination::SiteA),
        "siteB" | "siteb" | "b" => Ok(Destination::SiteB),
        "both" => Ok(Destination::Both),
        other => Err(format!("unknown destination '{other}' (siteA, siteB, both)")),
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Submit a video page link to the queue.
    Add {
        /// Page URL to scrape; its host must be on the configured allow list.
        link: String,
        /// Delivery target for the finished asset: siteA, siteB or both.
        #[arg(long, default_value = "both", value_parser = parse_destination)]
        destination: Destination,
        /// Opaque submitter credential, forwarded to the authorization check.
        #[arg(long)]
        credential: Option<String>,
    },

    /// Run the queue: dispatch workers and serve the subscriber socket.
    Run {
        /// Directory for downloaded media (default: ./downloads).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
        /// Override the configured worker limit.
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Show all jobs and their states.
    Status,

    /// Remove a job by id, from any non-terminal or terminal state.
    Remove {
        /// Job identifier.
        id: i64,
        /// Also delete the job's downloaded media file.
        #[arg(long)]
        delete_file: bool,
        /// Directory the media was downloaded to (default: ./downloads).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Requeue a failed job so it runs again.
    Requeue {
        /// Job identifier.
        id: i64,
    },

    /// Subscribe to the running queue and print events as they happen.
    Watch,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Add {
                link,
                destination,
                credential,
            } => run_add(&cfg, &link, destination, credential).await?,
            CliCommand::Run {
                download_dir,
                workers,
            } => {
                let download_dir = match download_dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?.join("downloads"),
                };
                run_queue(&cfg, download_dir, workers).await?;
            }
            CliCommand::Status => {
                let store = JobStore::open_default().await?;
                run_status(&store).await?;
            }
            CliCommand::Remove {
                id,
                delete_file,
                download_dir,
            } => run_remove(id, delete_file, download_dir.as_deref()).await?,
            CliCommand::Requeue { id } => run_requeue(id).await?,
            CliCommand::Watch => run_watch().await?,
        }

        Ok(())
    }
}
