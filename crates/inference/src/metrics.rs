use crate::errors::ErrorKind;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Instruments recorded once per analysis request.
#[derive(Clone)]
pub struct PipelineMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
}

impl PipelineMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        let duration = meter
            .f64_histogram("analysis_duration_seconds")
            .with_description("Time to analyze one image (pack + run + decode)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests = meter
            .u64_counter("analysis_requests_total")
            .with_description("Total analysis requests started")
            .build();
        let failures = meter
            .u64_counter("analysis_failures_total")
            .with_description("Analysis requests that ended in a failure, by kind")
            .build();
        let detections = meter
            .u64_counter("analysis_detections_total")
            .with_description("Total detections produced by the detector decoder")
            .build();

        Self {
            duration,
            requests,
            failures,
            detections,
        }
    }

    pub fn request_started(&self) {
        self.requests.add(1, &[]);
    }

    pub fn request_done(&self, elapsed: Duration, detections: usize) {
        self.duration.record(elapsed.as_secs_f64(), &[]);
        if detections > 0 {
            self.detections.add(detections as u64, &[]);
        }
    }

    pub fn request_failed(&self, kind: ErrorKind) {
        self.failures.add(1, &[KeyValue::new("kind", kind.as_str())]);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new("inference")
    }
}
