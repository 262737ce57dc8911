//! CLI argument definitions for the iamprobe binary.

use std::path::PathBuf;

use clap::Parser;
use iamprobe::constants::{DEFAULT_ENDPOINT, DEFAULT_TASKS, DEFAULT_TIMEOUT, MAX_TASKS};
use url::Url;

use crate::output::OutputFormat;

/// Quickly enumerate IAM permissions for a GCP account
#[derive(Parser, Debug)]
#[command(name = "iamprobe")]
#[command(about = "Quickly enumerate IAM permissions for a GCP account")]
#[command(version)]
pub struct Cli {
    /// GCP project ID
    #[arg(short, long, env = "IAMPROBE_PROJECT")]
    pub project: String,

    /// GCP access token
    #[arg(short, long, env = "IAMPROBE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Number of concurrent tasks
    #[arg(short = 'T', long = "threads", default_value_t = DEFAULT_TASKS, value_parser = parse_tasks)]
    pub threads: usize,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a single JSON document instead of one permission per line
    #[arg(short, long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Log messages in JSON format
    #[arg(short, long)]
    pub log_json: bool,

    /// File with candidate permissions, one per line (built-in list when omitted)
    #[arg(long, env = "IAMPROBE_PERMISSIONS_FILE")]
    pub permissions_file: Option<PathBuf>,

    /// API endpoint hosting testIamPermissions
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "IAMPROBE_ENDPOINT")]
    pub endpoint: Url,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Plain
        }
    }
}

fn parse_tasks(value: &str) -> Result<usize, String> {
    let tasks: usize = value
        .parse()
        .map_err(|_| format!("tasks must be a number between 1 and {MAX_TASKS}"))?;
    iamprobe::config::validate_tasks(tasks).map_err(|e| e.to_string())
}
