//! Drives discovered objects through fetch, compression and output.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};

use super::{CancelToken, ObjectOutcome, OutcomeStatus, PipelineOptions, RunReport, RunSummary, Stage};
use crate::compress::{CompressionPolicy, PdfCompressor};
use crate::error::{Error, Result};
use crate::model::BucketObject;
use crate::sink::{OutputSink, OutputTarget};
use crate::storage::{Bucket, ObjectFetcher, ObjectLister};

/// Receives progress events. All methods default to no-ops.
///
/// Callbacks run on the pipeline task and should return quickly.
pub trait PipelineObserver: Send + Sync {
    /// An object was pulled from the listing.
    fn on_discovered(&self, _object: &BucketObject) {}

    /// An object entered a new stage.
    fn on_stage(&self, _object: &BucketObject, _stage: Stage) {}

    /// An object finished, successfully or not.
    fn on_finished(&self, _outcome: &ObjectOutcome) {}
}

/// The compression-and-sync pipeline.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use reducepdf::{CompressionPolicy, ObjectStoreBucket, OutputTarget, Pipeline, PipelineOptions};
///
/// # async fn run() -> reducepdf::Result<()> {
/// let bucket = Arc::new(ObjectStoreBucket::gcs("my-bucket", None)?);
/// let pipeline = Pipeline::new(
///     bucket,
///     OutputTarget::local("pdfs"),
///     CompressionPolicy::default(),
///     PipelineOptions::default(),
/// )?;
/// let report = pipeline.run().await?;
/// println!("{} of {} succeeded", report.summary.succeeded, report.summary.total);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    bucket: Arc<dyn Bucket>,
    target: OutputTarget,
    compressor: Arc<PdfCompressor>,
    options: PipelineOptions,
    cancel: CancelToken,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl Pipeline {
    /// Create a pipeline, validating the policy and the options.
    pub fn new(
        bucket: Arc<dyn Bucket>,
        target: OutputTarget,
        policy: CompressionPolicy,
        options: PipelineOptions,
    ) -> Result<Self> {
        options.validate()?;
        let compressor = PdfCompressor::new(policy)?;

        Ok(Self {
            bucket,
            target,
            compressor: Arc::new(compressor),
            options,
            cancel: CancelToken::new(),
            observer: None,
        })
    }

    /// Use an externally owned cancel token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Token that cancels this pipeline.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process every PDF in the bucket.
    ///
    /// Returns `Err` only for failures that prevent the run from starting:
    /// a missing or unreadable bucket, or a listing that fails before the
    /// first object. Per-object failures are recorded in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut lister = ObjectLister::new(self.bucket.clone());
        if let Some(prefix) = &self.options.prefix {
            lister = lister.with_prefix(prefix.clone());
        }
        let fetcher = ObjectFetcher::new(self.bucket.clone())
            .with_max_object_size(self.options.max_object_size);
        let sink = OutputSink::from_target(&self.target, self.bucket.clone());

        if self.cancel.is_cancelled() {
            log::warn!("Cancelled before start");
            return Ok(self.report(started_at, Vec::new(), true, None));
        }

        log::info!(
            "Listing {}{}",
            self.bucket.name(),
            self.options
                .prefix
                .as_deref()
                .map(|p| format!(" under '{}'", p))
                .unwrap_or_default()
        );
        let mut listing = lister.objects();

        // Bucket-level problems surface here, before anything is fetched
        let mut next = match listing.next().await {
            Some(Ok(object)) => Some(object),
            Some(Err(e)) => {
                log::error!("Listing {} failed: {}", self.bucket.name(), e);
                return Err(e);
            }
            None => None,
        };
        let mut exhausted = next.is_none();

        let mut in_flight = FuturesUnordered::new();
        let mut outcomes = Vec::new();
        let mut scheduled = 0usize;
        let mut cancelled = false;
        let mut listing_error = None;

        loop {
            if !exhausted {
                if self.cancel.is_cancelled() {
                    log::warn!("Cancelled, letting {} in-flight objects finish", in_flight.len());
                    cancelled = true;
                    exhausted = true;
                    next = None;
                } else if self.options.limit.is_some_and(|limit| scheduled >= limit) {
                    log::info!("Reached the limit of {} objects", scheduled);
                    exhausted = true;
                    next = None;
                }
            }

            let has_room = in_flight.len() < self.options.concurrency;
            if has_room {
                if let Some(object) = next.take() {
                    scheduled += 1;
                    log::debug!("{}: {}", object.key, Stage::Discovered);
                    if let Some(observer) = &self.observer {
                        observer.on_discovered(&object);
                    }
                    in_flight.push(self.process(object, &fetcher, &sink));
                    continue;
                }
            }

            // The listing is pulled while in-flight objects keep making progress
            let pull = !exhausted && has_room;
            if !pull && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Some(observer) = &self.observer {
                        observer.on_stage(&outcome.object, Stage::Done);
                        observer.on_finished(&outcome);
                    }
                    outcomes.push(outcome);
                }
                item = listing.next(), if pull => match item {
                    Some(Ok(object)) => next = Some(object),
                    Some(Err(e)) => {
                        log::error!("Listing broke off after {} objects: {}", scheduled, e);
                        listing_error = Some(e.to_string());
                        exhausted = true;
                    }
                    None => exhausted = true,
                },
                else => break,
            }
        }

        let report = self.report(started_at, outcomes, cancelled, listing_error);
        log::info!(
            "Processed {} objects: {} succeeded, {} failed, {} bytes saved",
            report.summary.total,
            report.summary.succeeded,
            report.summary.failed,
            report.summary.bytes_saved()
        );
        Ok(report)
    }

    /// Run one object through the stages. Never fails; errors become a
    /// failure outcome carrying the stage they happened at.
    async fn process(
        &self,
        object: BucketObject,
        fetcher: &ObjectFetcher,
        sink: &OutputSink,
    ) -> ObjectOutcome {
        self.enter(&object, Stage::Fetching);
        let data = match fetcher.fetch(&object).await {
            Ok(data) => data,
            Err(e) => return self.fail(object, Stage::Fetching, e),
        };

        self.enter(&object, Stage::Compressing);
        let compressor = self.compressor.clone();
        let input = data.clone();
        let compressed = match tokio::task::spawn_blocking(move || compressor.compress(&input)).await
        {
            Ok(Ok(compressed)) => compressed,
            Ok(Err(e)) => return self.fail(object, Stage::Compressing, e),
            Err(e) => {
                let e = Error::Other(format!("compression task failed: {}", e));
                return self.fail(object, Stage::Compressing, e);
            }
        };
        let stats = compressed.stats;

        if stats.unchanged && sink.is_destructive() && self.options.skip_unchanged {
            log::info!("{}: already compact, upload skipped", object.key);
            return ObjectOutcome {
                object,
                status: OutcomeStatus::Success {
                    bytes_before: stats.bytes_before,
                    bytes_after: stats.bytes_after,
                    images_recompressed: stats.images_recompressed,
                    written: false,
                    location: None,
                },
            };
        }

        let output = if stats.unchanged {
            data
        } else {
            Bytes::from(compressed.bytes)
        };

        self.enter(&object, Stage::Writing);
        match sink.write(&object, output).await {
            Ok(receipt) => {
                log::info!(
                    "{}: {} -> {} bytes ({} images recompressed), written to {}",
                    object.key,
                    stats.bytes_before,
                    stats.bytes_after,
                    stats.images_recompressed,
                    receipt.location
                );
                ObjectOutcome {
                    object,
                    status: OutcomeStatus::Success {
                        bytes_before: stats.bytes_before,
                        bytes_after: stats.bytes_after,
                        images_recompressed: stats.images_recompressed,
                        written: true,
                        location: Some(receipt.location),
                    },
                }
            }
            Err(e) => self.fail(object, Stage::Writing, e),
        }
    }

    fn enter(&self, object: &BucketObject, stage: Stage) {
        log::debug!("{}: {}", object.key, stage);
        if let Some(observer) = &self.observer {
            observer.on_stage(object, stage);
        }
    }

    fn fail(&self, object: BucketObject, stage: Stage, error: Error) -> ObjectOutcome {
        log::warn!("{}: failed while {}: {}", object.key, stage, error);
        ObjectOutcome::failure(object, stage, &error)
    }

    fn report(
        &self,
        started_at: chrono::DateTime<Utc>,
        outcomes: Vec<ObjectOutcome>,
        cancelled: bool,
        listing_error: Option<String>,
    ) -> RunReport {
        RunReport {
            bucket: self.bucket.name().to_string(),
            target: self.target.clone(),
            started_at,
            finished_at: Utc::now(),
            summary: RunSummary::from_outcomes(&outcomes),
            outcomes,
            cancelled,
            listing_error,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("bucket", &self.bucket.name())
            .field("target", &self.target)
            .field("policy", self.compressor.policy())
            .field("options", &self.options)
            .finish()
    }
}
