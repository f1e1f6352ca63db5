//! Result files
//!
//! Download callbacks run on downloader tasks, so they only send their result
//! into a channel. A single background task turns each result into one file.

use crate::crawler::DownloadResult;
use crate::SumiError;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// File names never exceed this many characters
const MAX_FILE_NAME_LEN: usize = 50;

/// Counts reported by a finished `ResultWriter`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files written
    pub written: usize,

    /// Results that could not be written
    pub failed: usize,
}

/// Cloneable handle feeding results to a `ResultWriter`
#[derive(Debug, Clone)]
pub struct ResultSender {
    sender: mpsc::UnboundedSender<DownloadResult>,
}

impl ResultSender {
    /// Queues a result for writing; dropped with a warning if the writer is gone
    pub fn send(&self, result: DownloadResult) {
        if let Err(e) = self.sender.send(result) {
            tracing::warn!("Result writer closed, discarding {}", e.0.url);
        }
    }
}

/// Background task writing every received result to its own file
pub struct ResultWriter {
    sender: mpsc::UnboundedSender<DownloadResult>,
    task: JoinHandle<WriteSummary>,
}

impl ResultWriter {
    /// Spawns the writer task on the current tokio runtime
    ///
    /// `expected` is the number of results anticipated; it fixes the width
    /// of the sequence number in file names.
    pub fn spawn(directory: impl Into<PathBuf>, prefix: impl Into<String>, expected: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let namer = FileNamer::new(prefix.into(), expected);
        let task = tokio::spawn(write_results(directory.into(), namer, receiver));
        Self { sender, task }
    }

    pub fn sender(&self) -> ResultSender {
        ResultSender {
            sender: self.sender.clone(),
        }
    }

    /// Closes the channel and waits until every queued result is written
    ///
    /// Results sent through senders still alive elsewhere are written too;
    /// this returns once the last sender is dropped.
    pub async fn finish(self) -> Result<WriteSummary, SumiError> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| SumiError::Runtime(format!("result writer failed: {}", e)))
    }
}

async fn write_results(
    directory: PathBuf,
    mut namer: FileNamer,
    mut receiver: mpsc::UnboundedReceiver<DownloadResult>,
) -> WriteSummary {
    let mut summary = WriteSummary::default();

    while let Some(result) = receiver.recv().await {
        let path = directory.join(namer.next_name(&result.url));
        let body = if result.success {
            result.content
        } else {
            format!("{}\n", result).into_bytes()
        };

        match tokio::fs::write(&path, body).await {
            Ok(()) => {
                tracing::debug!("Wrote {}", path.display());
                summary.written += 1;
            }
            Err(e) => {
                tracing::error!("Failed to write {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Builds `<prefix><sequence><sanitized url>` file names
#[derive(Debug)]
struct FileNamer {
    prefix: String,
    width: usize,
    next: usize,
}

impl FileNamer {
    fn new(prefix: String, expected: usize) -> Self {
        Self {
            prefix,
            width: expected.max(1).to_string().len(),
            next: 0,
        }
    }

    fn next_name(&mut self, url: &str) -> String {
        let sanitized: String = url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let name = format!("{}{:0width$}{}", self.prefix, self.next, sanitized, width = self.width);
        self.next += 1;
        name.chars().take(MAX_FILE_NAME_LEN).collect()
    }
}
