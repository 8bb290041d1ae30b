use crate::PackError;
use crate::config::CHANNELS;
use ndarray::{Array, ArrayViewD, IxDyn};

/// Packed model input: shape `[1, height, width, 3]`, values in [0, 1], R,G,B order.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array<f32, IxDyn>,
    width: u32,
    height: u32,
}

impl InputTensor {
    /// Build a tensor from interleaved HWC values.
    pub fn from_hwc(width: u32, height: u32, values: Vec<f32>) -> Result<Self, PackError> {
        let expected = width as usize * height as usize * CHANNELS;
        if values.len() != expected {
            return Err(PackError::TensorLength {
                expected,
                actual: values.len(),
            });
        }

        let data = Array::from_shape_vec(
            IxDyn(&[1, height as usize, width as usize, CHANNELS]),
            values,
        )?;

        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Flat row-major values.
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_slice().unwrap_or_default()
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    /// The three channel values at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some([
            self.data[[0, y, x, 0]],
            self.data[[0, y, x, 1]],
            self.data[[0, y, x, 2]],
        ])
    }
}
