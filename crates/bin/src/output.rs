//! Output destinations and aggregate formatting.

use std::path::Path;

use iamprobe::{Findings, probe::OutputWriter};
use tokio::io::AsyncWriteExt;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One permission per line, written as soon as it is confirmed
    Plain,
    /// A single `{"permissions": [...]}` document written at the end
    Json,
}

/// Open the output destination, truncating an existing file.
pub async fn open(path: Option<&Path>) -> std::io::Result<OutputWriter> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write the aggregate JSON document and flush it.
pub async fn write_json(
    mut writer: OutputWriter,
    findings: &Findings,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = findings.to_json_pretty()?;
    writer.write_all(content.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
