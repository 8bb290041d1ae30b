use crate::backend::{BackendOptions, InferenceBackend, OutputTensor};
use crate::errors::{AnalysisError, AnalysisResult};
use preprocess::InputTensor;
use std::sync::{Mutex, MutexGuard};

/// Exclusive owner of a loaded model.
///
/// `run` calls are serialized behind a mutex. The backend is released exactly
/// once: by the first [`ModelHandle::release`] call or, failing that, on drop.
pub struct ModelHandle<B: InferenceBackend> {
    backend: Mutex<Option<B>>,
}

impl<B: InferenceBackend> ModelHandle<B> {
    /// Load a model from its serialized artifact.
    pub fn load(artifact: &[u8], options: &BackendOptions) -> AnalysisResult<Self> {
        let _s = common::span!("model_load");

        let backend = B::load(artifact, options).map_err(|e| {
            tracing::error!(error = %e, "Model load failed");
            AnalysisError::ModelLoad(format!("{:#}", e))
        })?;

        tracing::info!(artifact_bytes = artifact.len(), "Model loaded");
        Ok(Self::from_backend(backend))
    }

    /// Take ownership of an already constructed backend.
    pub fn from_backend(backend: B) -> Self {
        Self {
            backend: Mutex::new(Some(backend)),
        }
    }

    /// Run the model on `input`. The input is only read.
    pub fn run(&self, input: &InputTensor) -> AnalysisResult<OutputTensor> {
        let mut guard = self.lock()?;
        let backend = guard
            .as_mut()
            .ok_or_else(|| AnalysisError::Inference("model handle already released".into()))?;

        if let Some((width, height)) = backend.input_size() {
            if (input.width(), input.height()) != (width, height) {
                return Err(AnalysisError::Inference(format!(
                    "input is {}x{}, model expects {}x{}",
                    input.width(),
                    input.height(),
                    width,
                    height
                )));
            }
        }

        backend
            .run(input)
            .map_err(|e| AnalysisError::Inference(format!("{:#}", e)))
    }

    /// Model input size (width, height), if the backend declares one.
    pub fn input_size(&self) -> Option<(u32, u32)> {
        self.lock().ok()?.as_ref()?.input_size()
    }

    pub fn is_released(&self) -> bool {
        match self.backend.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    /// Free the backend. Later calls are no-ops.
    ///
    /// Waits for an in-flight `run` to finish first.
    pub fn release(&self) {
        let taken = match self.backend.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(backend) = taken {
            backend.release();
            tracing::info!("Model released");
        }
    }

    fn lock(&self) -> AnalysisResult<MutexGuard<'_, Option<B>>> {
        self.backend
            .lock()
            .map_err(|_| AnalysisError::Inference("model lock poisoned by a failed run".into()))
    }
}

impl<B: InferenceBackend> Drop for ModelHandle<B> {
    fn drop(&mut self) {
        self.release();
    }
}
