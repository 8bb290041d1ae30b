use crate::{
    backend::InferenceBackend,
    config::AnalyzerConfig,
    errors::{AnalysisError, AnalysisResult},
    handle::ModelHandle,
    metrics::PipelineMetrics,
    processing::{DecodedResult, ResultDecoder, decoder_for},
    record::AnalysisRecord,
    state_machine::{RequestState, RequestTracker},
};
use chrono::Local;
use preprocess::DecodedImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Successful outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: DecodedResult,
    pub elapsed: Duration,
}

impl Analysis {
    /// Record for the persistence collaborator, stamped with the current local time.
    pub fn to_record(&self, image_uri: impl Into<String>) -> AnalysisRecord {
        AnalysisRecord::from_result(&self.result, image_uri, Local::now())
    }
}

/// Turns decoded images into analyses with one shared model.
///
/// Each request runs pack, run and decode on a blocking worker. Dropping or
/// closing the pipeline discards in-flight results; the model is released once
/// the last in-flight request lets go of it.
pub struct InferencePipeline<B: InferenceBackend + 'static> {
    stages: Arc<Stages<B>>,
    closed: Arc<AtomicBool>,
}

struct Stages<B: InferenceBackend> {
    handle: ModelHandle<B>,
    decoder: Arc<dyn ResultDecoder>,
    input_size: (u32, u32),
    metrics: PipelineMetrics,
}

impl<B: InferenceBackend + 'static> InferencePipeline<B> {
    pub fn new(
        handle: ModelHandle<B>,
        decoder: Arc<dyn ResultDecoder>,
        input_size: (u32, u32),
    ) -> Self {
        let input_size = match handle.input_size() {
            Some(declared) if declared != input_size => {
                tracing::warn!(
                    configured = ?input_size,
                    declared = ?declared,
                    "Model declares a different input size, using the model's"
                );
                declared
            }
            _ => input_size,
        };

        Self {
            stages: Arc::new(Stages {
                handle,
                decoder,
                input_size,
                metrics: PipelineMetrics::default(),
            }),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(handle: ModelHandle<B>, config: &AnalyzerConfig) -> Self {
        let decoder = decoder_for(
            config.model_kind,
            config.model_kind.labels(),
            config.confidence_threshold,
        );
        Self::new(handle, decoder, config.input_size())
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.stages.input_size
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start analyzing `image` without blocking the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, image: DecodedImage) -> PendingAnalysis {
        let (mut tracker, state) = RequestTracker::channel();
        let stages = Arc::clone(&self.stages);
        let closed = Arc::clone(&self.closed);
        let worker_closed = Arc::clone(&self.closed);

        let task = tokio::task::spawn_blocking(move || {
            let result = stages.execute(&mut tracker, &image, &worker_closed);
            // Last holder releases the model here, before the result is observed.
            drop(stages);
            result
        });

        PendingAnalysis {
            state,
            task,
            closed,
        }
    }

    /// Analyze `image` and wait for the result.
    pub async fn analyze(&self, image: DecodedImage) -> AnalysisResult<Analysis> {
        self.submit(image)
            .outcome()
            .await
            .unwrap_or_else(|| Err(AnalysisError::Inference("pipeline closed".into())))
    }

    /// Analyze on the current thread. Blocks until the request is terminal.
    pub fn analyze_blocking(&self, image: &DecodedImage) -> AnalysisResult<Analysis> {
        let (mut tracker, _state) = RequestTracker::channel();
        self.stages.execute(&mut tracker, image, &self.closed)
    }

    /// Stop accepting work. In-flight results are discarded.
    pub fn close(self) {
        tracing::info!("Closing inference pipeline");
        drop(self);
    }
}

impl<B: InferenceBackend + 'static> Drop for InferencePipeline<B> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if Arc::strong_count(&self.stages) > 1 {
            tracing::debug!("Pipeline dropped with requests in flight");
        }
    }
}

impl<B: InferenceBackend> Stages<B> {
    fn execute(
        &self,
        tracker: &mut RequestTracker,
        image: &DecodedImage,
        closed: &AtomicBool,
    ) -> AnalysisResult<Analysis> {
        let _s = common::span!("analyze");
        let start = Instant::now();
        self.metrics.request_started();

        match self.run_stages(tracker, image, closed) {
            Ok(result) => {
                let elapsed = start.elapsed();
                tracker.advance(RequestState::Done);
                self.metrics.request_done(elapsed, result.detection_count());

                let (label, confidence) = result.summary();
                tracing::info!(
                    label = %label,
                    confidence = %confidence,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Analysis done"
                );
                Ok(Analysis { result, elapsed })
            }
            Err(e) => {
                tracker.advance(RequestState::Failed(e.kind()));
                self.metrics.request_failed(e.kind());
                tracing::warn!(kind = %e.kind(), error = %e, "Analysis failed");
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        tracker: &mut RequestTracker,
        image: &DecodedImage,
        closed: &AtomicBool,
    ) -> AnalysisResult<DecodedResult> {
        tracker.advance(RequestState::Packing);
        let input = {
            let _s = common::span_debug!("pack");
            preprocess::pack(image, self.input_size)?
        };

        if closed.load(Ordering::SeqCst) {
            return Err(AnalysisError::Inference("pipeline closed".into()));
        }

        tracker.advance(RequestState::Inferring);
        let output = {
            let _s = common::span_debug!("model_run");
            self.handle.run(&input)?
        };
        tracing::trace!(shape = ?output.shape(), "Model output");

        tracker.advance(RequestState::Decoding);
        let _s = common::span_debug!("decode");
        self.decoder.decode(&output)
    }
}

/// Handle to a submitted request.
pub struct PendingAnalysis {
    state: watch::Receiver<RequestState>,
    task: JoinHandle<AnalysisResult<Analysis>>,
    closed: Arc<AtomicBool>,
}

impl PendingAnalysis {
    /// Receiver observing every state transition of this request.
    pub fn state(&self) -> watch::Receiver<RequestState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> RequestState {
        *self.state.borrow()
    }

    /// Wait for the request to finish.
    ///
    /// Returns `None` when the pipeline was closed first; the result is discarded.
    pub async fn outcome(self) -> Option<AnalysisResult<Analysis>> {
        let joined = self.task.await;

        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!("Discarding result of a closed pipeline");
            return None;
        }

        Some(joined.unwrap_or_else(|e| {
            Err(AnalysisError::Inference(format!(
                "analysis worker failed: {}",
                e
            )))
        }))
    }

    /// Like [`PendingAnalysis::outcome`], but gives up after `timeout`.
    ///
    /// Expiry is reported as an inference failure. The worker keeps running
    /// until its current stage ends.
    pub async fn outcome_within(self, timeout: Duration) -> Option<AnalysisResult<Analysis>> {
        let closed = Arc::clone(&self.closed);
        match tokio::time::timeout(timeout, self.outcome()).await {
            Ok(outcome) => outcome,
            Err(_) if closed.load(Ordering::SeqCst) => None,
            Err(_) => Some(Err(AnalysisError::Inference(format!(
                "no result within {:?}",
                timeout
            )))),
        }
    }
}
