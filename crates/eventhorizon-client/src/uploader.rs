//! Background batching uploader for turn logs.
//!
//! A single worker task owns the batch buffer, the age timer, and the
//! running `Index`/`Version` counters. Records arrive over an mpsc channel
//! and leave as contiguous `AppendTurnLogsRequest` batches. The uploader
//! never retries; a version conflict is terminal because the server-side
//! state has diverged.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::Client;
use crate::client::tasks::{AppendTurnLogsRequest, AppendTurnLogsResponse};
use crate::error::Error;
use crate::types::LogRecord;

/// Destination of an upload stream, fixed for the uploader's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TurnRoute {
    pub tenant_id: String,
    pub task_id: String,
    pub turn_index: u64,
}

/// Where batches go. [`Client`] is the production sink; tests substitute
/// their own.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    async fn upload(&self, req: AppendTurnLogsRequest) -> Result<AppendTurnLogsResponse, Error>;
}

#[async_trait]
impl LogSink for Client {
    async fn upload(&self, req: AppendTurnLogsRequest) -> Result<AppendTurnLogsResponse, Error> {
        self.append_turn_logs(&req).await
    }
}

#[derive(Debug, Clone)]
pub struct LogUploaderOptions {
    /// Flush when the batch reaches this many records.
    pub max_batch_len: usize,
    /// Flush when the oldest buffered record reaches this age.
    pub max_batch_age: Duration,
    /// Flush before the estimated encoded size exceeds this.
    pub max_batch_bytes: usize,
    /// Initial `Index` reported to the server.
    pub start_index: u64,
    /// Initial optimistic-concurrency token.
    pub version: u64,
    /// When false, any upload failure stops the uploader instead of
    /// discarding the batch.
    pub drop_failed_batches: bool,
}

impl Default for LogUploaderOptions {
    fn default() -> Self {
        Self {
            max_batch_len: 500,
            max_batch_age: Duration::from_secs(1),
            max_batch_bytes: 1_048_576,
            start_index: 0,
            version: 0,
            drop_failed_batches: true,
        }
    }
}

/// Handle to the background worker.
pub struct LogUploader {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl LogUploader {
    /// Starts the worker draining `records`. The worker exits when the
    /// channel closes, the uploader is closed, or a conflict occurs; a final
    /// flush is attempted in every case.
    pub fn spawn<S: LogSink>(
        sink: S,
        route: TurnRoute,
        records: mpsc::Receiver<LogRecord>,
        options: LogUploaderOptions,
    ) -> Self {
        let cancel = CancellationToken::new();
        let worker = Worker {
            sink,
            route,
            cancel: cancel.clone(),
            index: options.start_index,
            version: options.version,
            batch: Vec::new(),
            batch_bytes: 0,
            overhead: record_overhead(),
            options,
        };
        let handle = tokio::spawn(worker.run(records));
        Self {
            cancel,
            worker: handle,
        }
    }

    /// Signals shutdown. The worker flushes what it holds and exits.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Waits for the worker to finish, up to `deadline`.
    pub async fn join(self, deadline: Duration) -> Result<(), Error> {
        match tokio::time::timeout(deadline, self.worker).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join)) => Err(Error::decode(format!("uploader worker panicked: {join}"))),
            Err(_) => Err(Error::Cancelled),
        }
    }
}

/// Encoded bytes one empty record contributes to the envelope, separator
/// included. Message bytes are charged on top of this.
fn record_overhead() -> usize {
    serde_json::to_vec(&LogRecord::default())
        .map(|encoded| encoded.len() + 1)
        .unwrap_or(64)
}

struct Worker<S> {
    sink: S,
    route: TurnRoute,
    cancel: CancellationToken,
    index: u64,
    version: u64,
    batch: Vec<LogRecord>,
    batch_bytes: usize,
    overhead: usize,
    options: LogUploaderOptions,
}

impl<S: LogSink> Worker<S> {
    async fn run(mut self, mut records: mpsc::Receiver<LogRecord>) {
        // Initial deadline is irrelevant; the branch below is gated on a
        // non-empty batch and the deadline is reset when a batch starts.
        let sleep = tokio::time::sleep(Duration::from_secs(86_400));
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.flush().await;
                    return;
                }
                () = &mut sleep, if !self.batch.is_empty() => {
                    self.flush().await;
                }
                record = records.recv() => {
                    let Some(record) = record else {
                        self.flush().await;
                        return;
                    };
                    let armed = self.append(record).await;
                    if armed {
                        sleep.as_mut().reset(
                            tokio::time::Instant::now() + self.options.max_batch_age,
                        );
                    }
                }
            }
            if self.cancel.is_cancelled() {
                self.flush().await;
                return;
            }
        }
    }

    /// Buffers one record, flushing first if it would overflow the batch.
    /// Returns true when the record started a fresh batch and the age timer
    /// must be armed.
    async fn append(&mut self, mut record: LogRecord) -> bool {
        let budget = self.options.max_batch_bytes.saturating_sub(self.overhead);
        if record.message.len() > budget {
            truncate_to_char_boundary(&mut record.message, budget);
        }
        let cost = self.overhead + record.message.len();

        if self.batch.len() + 1 > self.options.max_batch_len
            || self.batch_bytes + cost > self.options.max_batch_bytes
        {
            self.flush().await;
        }

        let starts_batch = self.batch.is_empty();
        self.batch.push(record);
        self.batch_bytes += cost;

        if self.batch.len() >= self.options.max_batch_len
            || self.batch_bytes >= self.options.max_batch_bytes
        {
            self.flush().await;
            return false;
        }
        starts_batch
    }

    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let logs = std::mem::take(&mut self.batch);
        let len = logs.len() as u64;
        self.batch_bytes = 0;

        let req = AppendTurnLogsRequest {
            tenant_id: self.route.tenant_id.clone(),
            task_id: self.route.task_id.clone(),
            turn_index: self.route.turn_index,
            version: self.version,
            index: self.index,
            logs,
        };
        match self.sink.upload(req).await {
            Ok(response) => {
                debug!(index = self.index, len, version = response.version, "uploaded log batch");
                self.index += len;
                self.version = response.version;
            }
            Err(err) if err.is_conflict() => {
                error!(index = self.index, %err, "log upload conflict, stopping uploader");
                self.cancel.cancel();
            }
            Err(err) => {
                warn!(index = self.index, len, %err, "log upload failed, dropping batch");
                if !self.options.drop_failed_batches {
                    self.cancel.cancel();
                }
            }
        }
    }
}

/// Truncates in place to at most `max` bytes without splitting a character.
fn truncate_to_char_boundary(message: &mut String, max: usize) {
    if message.len() <= max {
        return;
    }
    let mut end = max;
    while end > 0 && !message.is_char_boundary(end) {
        end -= 1;
    }
    message.truncate(end);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        uploads: Arc<Mutex<Vec<AppendTurnLogsRequest>>>,
        fail_with: Arc<Mutex<Option<Error>>>,
        next_version: Arc<Mutex<u64>>,
    }

    impl RecordingSink {
        fn with_initial_version(version: u64) -> Self {
            let sink = Self::default();
            *sink.next_version.lock().unwrap() = version;
            sink
        }

        fn uploads(&self) -> Vec<AppendTurnLogsRequest> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn upload(
            &self,
            req: AppendTurnLogsRequest,
        ) -> Result<AppendTurnLogsResponse, Error> {
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            self.uploads.lock().unwrap().push(req);
            let mut version = self.next_version.lock().unwrap();
            *version += 1;
            Ok(AppendTurnLogsResponse { version: *version })
        }
    }

    fn route() -> TurnRoute {
        TurnRoute {
            tenant_id: "t1".to_string(),
            task_id: "task-1".to_string(),
            turn_index: 0,
        }
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::new(chrono::DateTime::UNIX_EPOCH, message)
    }

    #[tokio::test]
    async fn batches_split_by_max_len_with_monotonic_index() {
        let sink = RecordingSink::with_initial_version(1);
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_len: 2,
                version: 1,
                ..Default::default()
            },
        );

        tx.send(record("r0")).await.unwrap();
        tx.send(record("r1")).await.unwrap();
        tx.send(record("r2")).await.unwrap();
        drop(tx);
        uploader.join(Duration::from_secs(5)).await.unwrap();

        let uploads = sink.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].index, 0);
        assert_eq!(uploads[0].version, 1);
        assert_eq!(uploads[0].logs.len(), 2);
        assert_eq!(uploads[1].index, 2);
        assert_eq!(uploads[1].version, 2);
        assert_eq!(uploads[1].logs.len(), 1);
        assert_eq!(uploads[1].logs[0].message, "r2");
    }

    #[tokio::test(start_paused = true)]
    async fn age_timer_flushes_a_partial_batch() {
        let sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_age: Duration::from_millis(100),
                ..Default::default()
            },
        );

        tx.send(record("only")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sink.uploads().len(), 1);

        drop(tx);
        uploader.join(Duration::from_secs(5)).await.unwrap();
        // Nothing left to flush at shutdown.
        assert_eq!(sink.uploads().len(), 1);
    }

    #[tokio::test]
    async fn close_flushes_buffered_records() {
        let sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(sink.clone(), route(), rx, LogUploaderOptions::default());

        tx.send(record("pending")).await.unwrap();
        // Let the worker pull the record off the channel.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        uploader.close();
        uploader.join(Duration::from_secs(5)).await.unwrap();

        let uploads = sink.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].logs[0].message, "pending");
    }

    #[tokio::test]
    async fn conflict_is_terminal() {
        let sink = RecordingSink::default();
        *sink.fail_with.lock().unwrap() = Some(Error::Conflict {
            response_code: 409,
            message: "version mismatch".to_string(),
            error_type: "Conflict".to_string(),
            current: crate::error::CurrentObject::Turn(crate::types::Turn {
                tenant_id: "t1".to_string(),
                task_id: "task-1".to_string(),
                turn_index: 0,
                state: String::new(),
                environment_id: None,
                version: 9,
                created_at: None,
                updated_at: None,
                deleted_at: None,
            }),
        });
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_len: 1,
                ..Default::default()
            },
        );

        tx.send(record("doomed")).await.unwrap();
        tx.send(record("never sent")).await.unwrap();
        uploader.join(Duration::from_secs(5)).await.unwrap();
        // The conflicting batch was not recorded and no later batch was
        // attempted with stale state.
        assert!(sink.uploads().is_empty());
    }

    #[tokio::test]
    async fn transport_error_drops_the_batch_and_continues() {
        let sink = RecordingSink::default();
        *sink.fail_with.lock().unwrap() = Some(Error::validation("boom"));
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_len: 1,
                ..Default::default()
            },
        );

        tx.send(record("lost")).await.unwrap();
        tx.send(record("delivered")).await.unwrap();
        drop(tx);
        uploader.join(Duration::from_secs(5)).await.unwrap();

        let uploads = sink.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].logs[0].message, "delivered");
        // The failed batch still advanced nothing.
        assert_eq!(uploads[0].index, 0);
        assert_eq!(uploads[0].version, 0);
    }

    #[tokio::test]
    async fn strict_mode_stops_on_any_failure() {
        let sink = RecordingSink::default();
        *sink.fail_with.lock().unwrap() = Some(Error::validation("boom"));
        let (tx, rx) = mpsc::channel(16);
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_len: 1,
                drop_failed_batches: false,
                ..Default::default()
            },
        );

        tx.send(record("lost")).await.unwrap();
        tx.send(record("also lost")).await.unwrap();
        uploader.join(Duration::from_secs(5)).await.unwrap();
        assert!(sink.uploads().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_truncated_on_a_char_boundary() {
        let sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(16);
        let overhead = record_overhead();
        let uploader = LogUploader::spawn(
            sink.clone(),
            route(),
            rx,
            LogUploaderOptions {
                max_batch_bytes: overhead + 5,
                ..Default::default()
            },
        );

        // "ééé" is six bytes; a five byte budget must cut at four.
        tx.send(record("ééé")).await.unwrap();
        drop(tx);
        uploader.join(Duration::from_secs(5)).await.unwrap();

        let uploads = sink.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].logs[0].message, "éé");
    }

    #[test]
    fn overhead_counts_the_empty_record_and_separator() {
        let encoded = serde_json::to_vec(&LogRecord::default()).unwrap();
        assert_eq!(record_overhead(), encoded.len() + 1);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let mut message = "aé".to_string();
        truncate_to_char_boundary(&mut message, 2);
        assert_eq!(message, "a");

        let mut message = "abc".to_string();
        truncate_to_char_boundary(&mut message, 10);
        assert_eq!(message, "abc");
    }
}
