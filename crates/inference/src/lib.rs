pub mod backend;
pub mod config;
pub mod errors;
pub mod handle;
pub mod image_source;
pub mod labels;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod processing;
pub mod record;
pub mod state_machine;

// Re-export commonly used types for convenience
pub use backend::{BackendOptions, ExecutionProvider, InferenceBackend, OutputTensor};
pub use config::AnalyzerConfig;
pub use errors::{AnalysisError, AnalysisResult, ErrorKind};
pub use handle::ModelHandle;
pub use labels::{LabelTable, RICE_VARIETIES};
pub use pipeline::{Analysis, InferencePipeline, PendingAnalysis};
pub use processing::{
    Classification, DecodedResult, Detection, ModelKind, ResultDecoder, decoder_for,
};
pub use record::{AnalysisRecord, JsonlSink, LogSink, RecordSink};
pub use state_machine::RequestState;
