use preprocess::InputTensor;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Raw model output. Its shape is model specific and only interpreted by a decoder.
pub type OutputTensor = ndarray::ArrayD<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

impl std::str::FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(ExecutionProvider::Cpu),
            "cuda" | "gpu" => Ok(ExecutionProvider::Cuda),
            other => Err(format!("unknown execution provider '{}'", other)),
        }
    }
}

/// Settings applied when a backend compiles a model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    pub intra_threads: usize,
    pub provider: ExecutionProvider,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            provider: ExecutionProvider::Cpu,
        }
    }
}

/// A model runtime able to execute one loaded artifact.
///
/// Implementations are not required to be safe for parallel `run` calls;
/// [`crate::ModelHandle`] serializes access.
pub trait InferenceBackend: Send {
    /// Parse and compile a model from its serialized bytes.
    fn load(artifact: &[u8], options: &BackendOptions) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Execute the model on one packed input.
    fn run(&mut self, input: &InputTensor) -> anyhow::Result<OutputTensor>;

    /// Spatial input size (width, height) the model was compiled for, when known.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Free native resources. Called exactly once by the owning handle.
    fn release(self)
    where
        Self: Sized,
    {
        drop(self)
    }
}
