use crate::backend::OutputTensor;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::labels::LabelTable;
use serde::Serialize;

/// Winning class of a classification model plus the full score vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    pub index: usize,
    pub score: f32,
    /// One score per label, in label-table order.
    pub scores: Vec<f32>,
    #[serde(skip)]
    pub labels: LabelTable,
}

impl Classification {
    /// Top score as a percentage with two decimals, e.g. `"87.50%"`.
    pub fn confidence_text(&self) -> String {
        format_percent(self.score)
    }

    /// Every label with its score, one per line.
    pub fn confidence_report(&self) -> String {
        let mut report = String::from("All Confidence Levels:\n\n");
        for (label, score) in self.labels.iter().zip(&self.scores) {
            report.push_str(&format!("{}: {}\n", label, format_percent(*score)));
        }
        report
    }

    /// (label, score) pairs in label-table order.
    pub fn scored_labels(&self) -> impl Iterator<Item = (&str, f32)> {
        self.labels.iter().zip(self.scores.iter().copied())
    }
}

pub(crate) fn format_percent(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Pick the best-scoring label.
///
/// `output` must hold exactly one score per label, in any shape (`[N]` or `[1, N]`).
/// The scan keeps the first maximum, so ties go to the lowest index. A NaN
/// score anywhere is a decode error.
pub fn decode_classification(
    output: &OutputTensor,
    labels: &LabelTable,
) -> AnalysisResult<Classification> {
    if labels.is_empty() {
        return Err(AnalysisError::Decode("label table is empty".into()));
    }
    if output.len() != labels.len() {
        return Err(AnalysisError::Decode(format!(
            "expected {} class scores, got {} (shape {:?})",
            labels.len(),
            output.len(),
            output.shape()
        )));
    }

    let scores: Vec<f32> = output.iter().copied().collect();
    if let Some(i) = scores.iter().position(|s| s.is_nan()) {
        return Err(AnalysisError::Decode(format!(
            "class score {} ({}) is NaN",
            i,
            labels.resolve(i as i64)
        )));
    }

    let mut index = 0;
    let mut score = scores[0];
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > score {
            score = s;
            index = i;
        }
    }

    let label = labels.resolve(index as i64);

    tracing::debug!(label = %label, score, "Classification decoded");

    Ok(Classification {
        label,
        index,
        score,
        scores,
        labels: labels.clone(),
    })
}
