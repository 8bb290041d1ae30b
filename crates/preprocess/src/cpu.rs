use crate::config::{CHANNEL_SCALE, CHANNELS};
use crate::{DecodedImage, InputTensor, PackError};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use std::borrow::Cow;

/// Resize `image` to `target` (width, height) and pack it into an [`InputTensor`].
///
/// Resampling is bilinear convolution. An image already at the target size is
/// copied without resampling.
pub fn pack(image: &DecodedImage, target: (u32, u32)) -> Result<InputTensor, PackError> {
    let _s = span!("pack");

    image.validate()?;

    let (target_width, target_height) = target;
    if target_width == 0 || target_height == 0 {
        return Err(PackError::InvalidTarget {
            width: target_width,
            height: target_height,
        });
    }

    tracing::trace!(
        width = image.width(),
        height = image.height(),
        target_width,
        target_height,
        "Packing image"
    );

    let resized = resize(image, target)?;
    normalize(&resized, target)
}

fn resize(image: &DecodedImage, target: (u32, u32)) -> Result<Cow<'_, [u8]>, PackError> {
    if (image.width(), image.height()) == target {
        return Ok(Cow::Borrowed(image.pixels()));
    }

    let _s = span!("resize");

    let src = ImageRef::new(
        image.width(),
        image.height(),
        image.pixels(),
        PixelType::U8x3,
    )?;
    let mut dst = Image::new(target.0, target.1, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
    )?;

    Ok(Cow::Owned(dst.buffer().to_vec()))
}

fn normalize(pixels: &[u8], target: (u32, u32)) -> Result<InputTensor, PackError> {
    let _s = span!("normalize");

    let mut values = Vec::with_capacity(target.0 as usize * target.1 as usize * CHANNELS);

    // Buffer is row-major, so chunk order is y outer, x inner.
    for px in pixels.chunks_exact(CHANNELS) {
        values.push(px[0] as f32 / CHANNEL_SCALE);
        values.push(px[1] as f32 / CHANNEL_SCALE);
        values.push(px[2] as f32 / CHANNEL_SCALE);
    }

    InputTensor::from_hwc(target.0, target.1, values)
}

/// Packer bound to one model's input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuPacker {
    pub input_size: (u32, u32),
}

impl CpuPacker {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    pub fn pack(&self, image: &DecodedImage) -> Result<InputTensor, PackError> {
        pack(image, self.input_size)
    }
}

impl Default for CpuPacker {
    fn default() -> Self {
        Self::new(crate::config::CLASSIFIER_INPUT_SIZE)
    }
}
