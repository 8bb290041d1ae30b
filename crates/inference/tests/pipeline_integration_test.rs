use inference::{
    AnalysisError, BackendOptions, DecodedResult, ErrorKind, InferenceBackend, InferencePipeline,
    LabelTable, ModelHandle, ModelKind, OutputTensor, RequestState, decoder_for,
};
use ndarray::{Array, IxDyn};
use preprocess::{DecodedImage, InputTensor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Counters shared between a test and its tracking backend
#[derive(Default)]
struct Tracker {
    runs: AtomicUsize,
    releases: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Fake model that returns a canned output and records how it is used
struct TrackingBackend {
    output: OutputTensor,
    tracker: Arc<Tracker>,
    gate: Option<mpsc::Receiver<()>>,
    hold: Duration,
}

impl TrackingBackend {
    fn new(output: OutputTensor, tracker: &Arc<Tracker>) -> Self {
        Self {
            output,
            tracker: Arc::clone(tracker),
            gate: None,
            hold: Duration::ZERO,
        }
    }

    /// `run` blocks until the returned sender fires
    fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(rx);
        (self, tx)
    }

    fn holding(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

impl InferenceBackend for TrackingBackend {
    fn load(_artifact: &[u8], _options: &BackendOptions) -> anyhow::Result<Self> {
        anyhow::bail!("tracking backend is constructed directly")
    }

    fn run(&mut self, _input: &InputTensor) -> anyhow::Result<OutputTensor> {
        let active = self.tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.recv()?;
        }
        if !self.hold.is_zero() {
            thread::sleep(self.hold);
        }

        self.tracker.runs.fetch_add(1, Ordering::SeqCst);
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        Some((32, 32))
    }

    fn release(self) {
        self.tracker.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn scores(values: &[f32]) -> OutputTensor {
    Array::from_shape_vec(IxDyn(&[1, values.len()]), values.to_vec()).unwrap()
}

fn detector_rows(rows: &[[f32; 6]]) -> OutputTensor {
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    Array::from_shape_vec(IxDyn(&[1, rows.len(), 6]), data).unwrap()
}

fn pipeline(backend: TrackingBackend, kind: ModelKind) -> InferencePipeline<TrackingBackend> {
    let decoder = decoder_for(kind, kind.labels(), 0.25);
    InferencePipeline::new(ModelHandle::from_backend(backend), decoder, (32, 32))
}

fn grain_photo() -> DecodedImage {
    DecodedImage::filled(120, 90, [214, 196, 160])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_classifier_end_to_end() {
    let tracker = Arc::new(Tracker::default());
    let backend = TrackingBackend::new(scores(&[0.05, 0.875, 0.025, 0.03, 0.02]), &tracker);
    let pipeline = pipeline(backend, ModelKind::Classifier);

    let pending = pipeline.submit(grain_photo());
    let mut state = pending.state();
    let analysis = pending.outcome().await.unwrap().unwrap();

    match &analysis.result {
        DecodedResult::Classification(c) => {
            assert_eq!(c.label, "Jasmine");
            assert_eq!(c.index, 1);
            assert_eq!(c.confidence_text(), "87.50%");
        }
        other => panic!("Expected classification, got {:?}", other),
    }
    assert_eq!(*state.borrow_and_update(), RequestState::Done);
    assert_eq!(tracker.runs.load(Ordering::SeqCst), 1);

    let record = analysis.to_record("file:///photos/grain.jpg");
    assert_eq!(record.result, "Jasmine");
    assert_eq!(record.confidence_level, "87.50%");

    pipeline.close();
    assert_eq!(tracker.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detector_end_to_end() {
    let tracker = Arc::new(Tracker::default());
    let output = detector_rows(&[
        [10.0, 20.0, 30.0, 40.0, 0.9, 0.0],
        [50.0, 60.0, 70.0, 80.0, 0.1, 1.0],
        [15.0, 25.0, 35.0, 45.0, 0.6, 99.0],
    ]);
    let pipeline = pipeline(TrackingBackend::new(output, &tracker), ModelKind::Detector);

    let analysis = pipeline.analyze(grain_photo()).await.unwrap();

    let DecodedResult::Detections { detections } = &analysis.result else {
        panic!("Expected detections, got {:?}", analysis.result);
    };
    let labels: Vec<_> = detections.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["Dinorado", "cls99"], "Order preserved, low row dropped");
    assert_eq!(
        analysis.result.summary(),
        ("Dinorado".to_string(), "90.00%".to_string())
    );
}

#[tokio::test]
async fn test_invalid_image_fails_without_running_model() {
    let tracker = Arc::new(Tracker::default());
    let pipeline = pipeline(
        TrackingBackend::new(scores(&[0.2; 5]), &tracker),
        ModelKind::Classifier,
    );

    // Buffer one byte short of 4x4 RGB
    let pending = pipeline.submit(DecodedImage::new(4, 4, vec![0; 47]));
    let mut state = pending.state();
    let outcome = pending.outcome().await.unwrap();

    match outcome {
        Err(AnalysisError::InvalidImage(msg)) => assert!(msg.contains("expected 48"), "{}", msg),
        other => panic!("Expected InvalidImage, got {:?}", other),
    }
    assert_eq!(
        *state.borrow_and_update(),
        RequestState::Failed(ErrorKind::InvalidImage)
    );
    assert_eq!(tracker.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_label_count_mismatch_is_decode_error() {
    let tracker = Arc::new(Tracker::default());
    let pipeline = pipeline(
        TrackingBackend::new(scores(&[0.1, 0.2, 0.3, 0.4]), &tracker),
        ModelKind::Classifier,
    );

    let pending = pipeline.submit(grain_photo());
    let mut state = pending.state();
    let err = pending.outcome().await.unwrap().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(
        *state.borrow_and_update(),
        RequestState::Failed(ErrorKind::Decode)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_stays_inferring_while_model_runs() {
    let tracker = Arc::new(Tracker::default());
    let (backend, gate) =
        TrackingBackend::new(scores(&[0.2, 0.2, 0.2, 0.2, 0.2]), &tracker).gated();
    let pipeline = pipeline(backend, ModelKind::Classifier);

    let pending = pipeline.submit(grain_photo());
    let mut state = pending.state();

    state
        .wait_for(|s| *s == RequestState::Inferring)
        .await
        .unwrap();
    assert!(!pending.current_state().is_terminal());

    gate.send(()).unwrap();
    let analysis = pending.outcome().await.unwrap().unwrap();
    assert_eq!(analysis.result.summary().0, "Dinorado", "Ties go to index 0");
    assert_eq!(*state.borrow_and_update(), RequestState::Done);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_during_inference_releases_once() {
    let tracker = Arc::new(Tracker::default());
    let (backend, gate) =
        TrackingBackend::new(scores(&[0.1, 0.2, 0.3, 0.2, 0.2]), &tracker).gated();
    let pipeline = pipeline(backend, ModelKind::Classifier);

    let pending = pipeline.submit(grain_photo());
    let mut state = pending.state();
    state
        .wait_for(|s| *s == RequestState::Inferring)
        .await
        .unwrap();

    pipeline.close();
    assert_eq!(
        tracker.releases.load(Ordering::SeqCst),
        0,
        "Model stays alive while a run is in flight"
    );

    gate.send(()).unwrap();
    assert!(pending.outcome().await.is_none(), "Result is discarded");
    assert_eq!(tracker.runs.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_maps_to_inference_error() {
    let tracker = Arc::new(Tracker::default());
    let (backend, gate) = TrackingBackend::new(scores(&[0.2; 5]), &tracker).gated();
    let pipeline = pipeline(backend, ModelKind::Classifier);

    let pending = pipeline.submit(grain_photo());
    let outcome = pending.outcome_within(Duration::from_millis(50)).await;

    match outcome {
        Some(Err(AnalysisError::Inference(msg))) => assert!(msg.contains("no result within")),
        other => panic!("Expected Inference timeout, got {:?}", other),
    }

    gate.send(()).unwrap();
    pipeline.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_runs_are_serialized_per_handle() {
    let tracker = Arc::new(Tracker::default());
    let backend = TrackingBackend::new(scores(&[0.1, 0.1, 0.1, 0.1, 0.6]), &tracker)
        .holding(Duration::from_millis(20));
    let pipeline = pipeline(backend, ModelKind::Classifier);

    let pending: Vec<_> = (0..4).map(|_| pipeline.submit(grain_photo())).collect();
    for request in pending {
        let analysis = request.outcome().await.unwrap().unwrap();
        assert_eq!(analysis.result.summary().0, "V160");
    }

    assert_eq!(tracker.runs.load(Ordering::SeqCst), 4);
    assert_eq!(
        tracker.max_active.load(Ordering::SeqCst),
        1,
        "At most one run per handle at a time"
    );
}

#[test]
fn test_release_twice_and_drop() {
    let tracker = Arc::new(Tracker::default());
    let handle = ModelHandle::from_backend(TrackingBackend::new(scores(&[0.2; 5]), &tracker));

    handle.release();
    handle.release();
    drop(handle);

    assert_eq!(tracker.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_blocking_analysis_with_detector_labels() {
    let tracker = Arc::new(Tracker::default());
    let output = detector_rows(&[[0.0, 0.0, 8.0, 8.0, 0.4, 4.0]]);
    let pipeline = pipeline(TrackingBackend::new(output, &tracker), ModelKind::Detector);

    let analysis = pipeline.analyze_blocking(&grain_photo()).unwrap();
    assert_eq!(analysis.result.detection_count(), 1);
    assert_eq!(analysis.result.summary().0, "V160");
    assert_eq!(LabelTable::detector().get(4), Some("V160"));

    drop(pipeline);
    assert_eq!(tracker.releases.load(Ordering::SeqCst), 1);
}
