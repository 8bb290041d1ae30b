use crate::backend::OutputTensor;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::labels::LabelTable;
use serde::Serialize;

/// Values per candidate row: xmin, ymin, xmax, ymax, confidence, class index.
pub const ROW_WIDTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Box corners in model input coordinates
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: i64,
    pub label: String,
}

/// Filter and label detector candidate rows.
///
/// Rows below `confidence_threshold`, and rows whose class index is not a
/// finite number, are dropped. Surviving rows keep their input order: no
/// ranking and no non-maximum suppression, so overlapping boxes for the same
/// grain may all be reported.
pub fn decode_detections(
    output: &OutputTensor,
    labels: &LabelTable,
    confidence_threshold: f32,
) -> AnalysisResult<Vec<Detection>> {
    let row_width = output.shape().last().copied().unwrap_or(0);
    if output.ndim() < 2 || row_width != ROW_WIDTH {
        return Err(AnalysisError::Decode(format!(
            "expected candidate rows of {} values, got shape {:?}",
            ROW_WIDTH,
            output.shape()
        )));
    }

    let contiguous = output.as_standard_layout();
    let values = contiguous
        .as_slice()
        .ok_or_else(|| AnalysisError::Decode("output is not contiguous".into()))?;

    let mut detections = Vec::new();
    let mut discarded = 0usize;

    for row in values.chunks_exact(ROW_WIDTH) {
        let confidence = row[4];

        if confidence.is_nan() || confidence < confidence_threshold {
            discarded += 1;
            continue;
        }

        if !row[5].is_finite() {
            tracing::warn!(class_value = row[5], "Discarding row with non-finite class index");
            discarded += 1;
            continue;
        }
        let class_id = row[5].round() as i64;

        detections.push(Detection {
            x1: row[0],
            y1: row[1],
            x2: row[2],
            y2: row[3],
            confidence,
            class_id,
            label: labels.resolve(class_id),
        });
    }

    tracing::debug!(
        kept = detections.len(),
        discarded,
        confidence_threshold,
        "Detections decoded"
    );

    Ok(detections)
}

/// The highest-confidence detection; earliest row wins ties.
pub fn most_confident(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best, d| match best {
        Some(b) if b.confidence >= d.confidence => Some(b),
        _ => Some(d),
    })
}
