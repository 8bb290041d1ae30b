use super::{BackendOptions, ExecutionProvider, InferenceBackend, OutputTensor};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::{TensorRef, ValueType},
};
use preprocess::InputTensor;

/// ONNX Runtime session compiled from an in-memory model artifact.
pub struct OrtBackend {
    session: Session,
    input_size: Option<(u32, u32)>,
}

impl OrtBackend {
    fn build_session(artifact: &[u8], options: &BackendOptions) -> anyhow::Result<Session> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads)?;

        match options.provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        Ok(builder.commit_from_memory(artifact)?)
    }

    fn declared_input_size(session: &Session) -> Option<(u32, u32)> {
        let input = session.inputs().first()?;
        match input.dtype() {
            ValueType::Tensor { shape, .. } => {
                let dims: Vec<i64> = shape.iter().copied().collect();
                nhwc_spatial_size(&dims)
            }
            _ => None,
        }
    }
}

/// (width, height) of a static NHWC shape `[N, H, W, 3]`. Dynamic (`-1`) or
/// channel-first shapes yield `None`.
fn nhwc_spatial_size(dims: &[i64]) -> Option<(u32, u32)> {
    match dims {
        [_, h, w, 3] if *h > 0 && *w > 0 => {
            Some((u32::try_from(*w).ok()?, u32::try_from(*h).ok()?))
        }
        _ => None,
    }
}

impl InferenceBackend for OrtBackend {
    fn load(artifact: &[u8], options: &BackendOptions) -> anyhow::Result<Self> {
        if artifact.is_empty() {
            anyhow::bail!("model artifact is empty");
        }

        let session = Self::build_session(artifact, options)?;
        let input_size = Self::declared_input_size(&session);

        tracing::info!(
            artifact_bytes = artifact.len(),
            input_size = ?input_size,
            "ONNX model compiled"
        );

        Ok(Self {
            session,
            input_size,
        })
    }

    fn run(&mut self, input: &InputTensor) -> anyhow::Result<OutputTensor> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let output = outputs[0].try_extract_array::<f32>()?;

        Ok(output.into_owned())
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        self.input_size
    }

    fn release(self) {
        tracing::debug!("Dropping ONNX Runtime session");
        drop(self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nhwc_shape_gives_width_and_height() {
        assert_eq!(nhwc_spatial_size(&[1, 224, 224, 3]), Some((224, 224)));
        assert_eq!(nhwc_spatial_size(&[1, 480, 640, 3]), Some((640, 480)));
    }

    #[test]
    fn channel_first_shape_is_not_declared() {
        assert_eq!(nhwc_spatial_size(&[1, 3, 224, 224]), None);
    }

    #[test]
    fn dynamic_dimensions_are_not_declared() {
        assert_eq!(nhwc_spatial_size(&[-1, -1, -1, 3]), None);
        assert_eq!(nhwc_spatial_size(&[1, 224, -1, 3]), None);
        assert_eq!(nhwc_spatial_size(&[224, 224, 3]), None);
    }
}
