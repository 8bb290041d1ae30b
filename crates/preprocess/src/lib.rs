pub mod config;
pub mod cpu;
pub mod errors;
pub mod image;
pub mod tensor;

pub use config::{CLASSIFIER_INPUT_SIZE, DETECTOR_INPUT_SIZE};
pub use cpu::{CpuPacker, pack};
pub use errors::PackError;
pub use image::DecodedImage;
pub use tensor::InputTensor;
