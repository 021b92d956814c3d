use crate::models::{IngestRecord, IngestionOptions};
use crate::traits::SearchIndex;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Pause between two consecutive batches; none after the last one.
    pub pace: Duration,
    pub abort_on_failure: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&IngestionOptions::default())
    }
}

impl From<&IngestionOptions> for BatchConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            batch_size: value.batch_size,
            pace: value.batch_pace,
            abort_on_failure: value.abort_on_batch_failure,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub failed: usize,
    /// Ids of records in batches the index accepted, in upload order.
    pub indexed_ids: Vec<String>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Uploads `records` in order, one request per batch, pausing between batches.
///
/// A rejected batch is logged and counted; later batches still go out unless
/// `abort_on_failure` is set.
pub async fn upload_in_batches<I>(index: &I, records: &[IngestRecord], config: BatchConfig) -> BatchReport
where
    I: SearchIndex + ?Sized,
{
    let mut report = BatchReport::default();
    let batch_size = config.batch_size.max(1);
    let total = records.len().div_ceil(batch_size);

    for (position, batch) in records.chunks(batch_size).enumerate() {
        if position > 0 && !config.pace.is_zero() {
            tokio::time::sleep(config.pace).await;
        }

        report.attempted += 1;
        match index.upload_batch(batch).await {
            Ok(()) => {
                debug!(batch = position + 1, total, size = batch.len(), "index batch uploaded");
                report
                    .indexed_ids
                    .extend(batch.iter().map(|record| record.id.clone()));
            }
            Err(error) => {
                report.failed += 1;
                warn!(batch = position + 1, total, size = batch.len(), %error, "index batch failed");
                if config.abort_on_failure {
                    break;
                }
            }
        }
    }

    report
}
