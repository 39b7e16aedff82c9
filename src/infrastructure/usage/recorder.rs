//! Usage recorder
//!
//! Records travel through a bounded channel to a background writer so the
//! request path never waits on storage. Records still queued when the process
//! dies are lost; at most `buffer_size` of them. When the queue is full the
//! record is written inline instead of being dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::usage::{UsageRecord, UsageRepository, UsageStats};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_usage_inline_write;

pub const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Debug)]
enum WriterCommand {
    Record(UsageRecord),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug)]
pub struct UsageRecorder {
    repository: Arc<dyn UsageRepository>,
    sender: mpsc::Sender<WriterCommand>,
}

impl UsageRecorder {
    /// Start the recorder and its writer task. Must run inside a Tokio runtime.
    pub fn new(repository: Arc<dyn UsageRepository>, buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        tokio::spawn(run_writer(repository.clone(), receiver));

        Self { repository, sender }
    }

    pub async fn append_usage(&self, record: UsageRecord) {
        let record = match self.sender.try_send(WriterCommand::Record(record)) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(WriterCommand::Record(record))) => {
                debug!("Usage queue full, writing inline");
                record_usage_inline_write();
                record
            }
            Err(mpsc::error::TrySendError::Closed(WriterCommand::Record(record))) => {
                warn!("Usage writer stopped, writing inline");
                record
            }
            Err(_) => return,
        };

        if let Err(e) = self.repository.append(record).await {
            error!(error = %e, "Failed to persist usage record");
        }
    }

    /// Wait until every record queued so far has been persisted
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(WriterCommand::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Records with `since <= timestamp <= until`
    pub async fn get_usage(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>, DomainError> {
        self.flush().await;
        self.repository.query(since, until).await
    }

    /// Remove records strictly older than `older_than`
    pub async fn clear_old_records(&self, older_than: DateTime<Utc>) -> Result<usize, DomainError> {
        self.flush().await;
        let removed = self.repository.delete_before(older_than).await?;
        info!(removed, %older_than, "Cleared old usage records");
        Ok(removed)
    }

    pub async fn get_stats(&self, since: Option<DateTime<Utc>>) -> Result<UsageStats, DomainError> {
        let records = self.get_usage(since, None).await?;
        Ok(UsageStats::from_records(&records))
    }
}

async fn run_writer(repository: Arc<dyn UsageRepository>, mut receiver: mpsc::Receiver<WriterCommand>) {
    while let Some(command) = receiver.recv().await {
        match command {
            WriterCommand::Record(record) => {
                if let Err(e) = repository.append(record).await {
                    error!(error = %e, "Failed to persist usage record");
                }
            }
            WriterCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Usage writer stopped");
}

/// Periodically drop records older than `retention`
pub fn spawn_retention_task(
    recorder: Arc<UsageRecorder>,
    retention: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - retention;
            if let Err(e) = recorder.clear_old_records(cutoff).await {
                warn!(error = %e, "Usage retention pass failed");
            }
        }
    })
}
