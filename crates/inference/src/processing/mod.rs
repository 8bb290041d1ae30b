pub mod classify;
pub mod detect;

use crate::backend::OutputTensor;
use crate::errors::AnalysisResult;
use crate::labels::LabelTable;
use preprocess::{CLASSIFIER_INPUT_SIZE, DETECTOR_INPUT_SIZE};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use classify::{Classification, decode_classification};
pub use detect::{Detection, decode_detections, most_confident};

/// Which output contract the active model follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    Classifier,
    Detector,
}

impl ModelKind {
    pub fn default_input_size(&self) -> (u32, u32) {
        match self {
            ModelKind::Classifier => CLASSIFIER_INPUT_SIZE,
            ModelKind::Detector => DETECTOR_INPUT_SIZE,
        }
    }

    pub fn labels(&self) -> LabelTable {
        match self {
            ModelKind::Classifier => LabelTable::classifier(),
            ModelKind::Detector => LabelTable::detector(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Classifier => "classifier",
            ModelKind::Detector => "detector",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classifier" | "classification" => Ok(ModelKind::Classifier),
            "detector" | "detection" => Ok(ModelKind::Detector),
            other => Err(format!("unknown model kind '{}'", other)),
        }
    }
}

/// Structured outcome of one decoded model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedResult {
    Classification(Classification),
    Detections { detections: Vec<Detection> },
}

impl DecodedResult {
    /// Label and confidence text summarizing the result.
    ///
    /// A detection result is summarized by its most confident detection.
    pub fn summary(&self) -> (String, String) {
        match self {
            DecodedResult::Classification(c) => (c.label.clone(), c.confidence_text()),
            DecodedResult::Detections { detections } => match most_confident(detections) {
                Some(best) => (best.label.clone(), classify::format_percent(best.confidence)),
                None => ("No grains detected".to_string(), "N/A".to_string()),
            },
        }
    }

    pub fn detection_count(&self) -> usize {
        match self {
            DecodedResult::Classification(_) => 0,
            DecodedResult::Detections { detections } => detections.len(),
        }
    }
}

/// Turns a raw output tensor into a [`DecodedResult`].
pub trait ResultDecoder: Send + Sync {
    fn decode(&self, output: &OutputTensor) -> AnalysisResult<DecodedResult>;
}

#[derive(Debug, Clone)]
pub struct ClassifierDecoder {
    labels: LabelTable,
}

impl ClassifierDecoder {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }
}

impl ResultDecoder for ClassifierDecoder {
    fn decode(&self, output: &OutputTensor) -> AnalysisResult<DecodedResult> {
        decode_classification(output, &self.labels).map(DecodedResult::Classification)
    }
}

#[derive(Debug, Clone)]
pub struct DetectorDecoder {
    labels: LabelTable,
    confidence_threshold: f32,
}

impl DetectorDecoder {
    pub fn new(labels: LabelTable, confidence_threshold: f32) -> Self {
        Self {
            labels,
            confidence_threshold,
        }
    }
}

impl ResultDecoder for DetectorDecoder {
    fn decode(&self, output: &OutputTensor) -> AnalysisResult<DecodedResult> {
        decode_detections(output, &self.labels, self.confidence_threshold)
            .map(|detections| DecodedResult::Detections { detections })
    }
}

/// Decoder for `kind`, chosen from configuration rather than from the output shape.
pub fn decoder_for(
    kind: ModelKind,
    labels: LabelTable,
    confidence_threshold: f32,
) -> Arc<dyn ResultDecoder> {
    match kind {
        ModelKind::Classifier => Arc::new(ClassifierDecoder::new(labels)),
        ModelKind::Detector => Arc::new(DetectorDecoder::new(labels, confidence_threshold)),
    }
}
