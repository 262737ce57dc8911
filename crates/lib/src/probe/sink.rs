//! Consumers for the granted-permission and error streams.
//!
//! The sink task is the only owner of the collected results; shard workers
//! reach it through the output channel alone.

use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::error;

use super::errors::TaskError;

/// Destination for streamed permission lines.
pub type OutputWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Aggregate output, serialized as `{"permissions": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub permissions: Vec<String>,
}

impl Findings {
    /// Render as indented JSON followed by a newline.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Consumer of granted permissions.
///
/// Always keeps every permission in arrival order. A streaming sink also
/// writes each one as a line the moment it arrives.
pub struct Sink {
    writer: Option<OutputWriter>,
}

impl Sink {
    /// Buffer permissions for aggregate output only.
    pub fn collecting() -> Self {
        Self { writer: None }
    }

    /// Write each permission to `writer` followed by a newline as it arrives.
    pub fn streaming(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
        }
    }

    /// Drain `granted` until every sender is gone.
    ///
    /// Write failures go to `errors` and do not stop consumption.
    pub async fn consume(
        mut self,
        mut granted: mpsc::UnboundedReceiver<String>,
        errors: mpsc::Sender<TaskError>,
    ) -> Vec<String> {
        let mut permissions = Vec::new();
        while let Some(permission) = granted.recv().await {
            if let Some(writer) = self.writer.as_mut()
                && let Err(e) = write_line(writer, &permission).await
            {
                let _ = errors.send(TaskError::Output(e)).await;
            }
            permissions.push(permission);
        }
        permissions
    }
}

async fn write_line(writer: &mut OutputWriter, permission: &str) -> std::io::Result<()> {
    writer.write_all(permission.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Log and collect every task error until all senders are gone.
pub async fn drain_errors(mut errors: mpsc::Receiver<TaskError>) -> Vec<TaskError> {
    let mut collected = Vec::new();
    while let Some(task_error) = errors.recv().await {
        error!(error = %task_error, shard = ?task_error.shard(), "Task error");
        collected.push(task_error);
    }
    collected
}
