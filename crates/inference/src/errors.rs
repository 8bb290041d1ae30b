use preprocess::PackError;
use std::fmt;
use thiserror::Error;

/// Failure category of an analysis request. Every kind is terminal for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidImage,
    ModelLoad,
    Inference,
    Decode,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidImage => "invalid_image",
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::Inference => "inference",
            ErrorKind::Decode => "decode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Decode failed: {0}")]
    Decode(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidImage(_) => ErrorKind::InvalidImage,
            AnalysisError::ModelLoad(_) => ErrorKind::ModelLoad,
            AnalysisError::Inference(_) => ErrorKind::Inference,
            AnalysisError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Human-readable detail without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            AnalysisError::InvalidImage(msg)
            | AnalysisError::ModelLoad(msg)
            | AnalysisError::Inference(msg)
            | AnalysisError::Decode(msg) => msg,
        }
    }
}

impl From<PackError> for AnalysisError {
    fn from(err: PackError) -> Self {
        AnalysisError::InvalidImage(err.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
