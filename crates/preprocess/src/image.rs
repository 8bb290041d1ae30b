use crate::PackError;
use crate::config::CHANNELS;

/// An 8-bit RGB image in row-major order, as handed over by the image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap an RGB8 buffer. Dimensions are checked when the image is packed.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A `width` x `height` image filled with one colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let pixels = rgb.iter().copied().cycle().take(count * CHANNELS).collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGB value at (x, y), if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.pixels
            .get(idx..idx + CHANNELS)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Check the image is non-empty and the buffer matches its dimensions.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.width == 0 || self.height == 0 {
            return Err(PackError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.pixels.is_empty() {
            return Err(PackError::EmptyBuffer);
        }

        let expected = self.width as usize * self.height as usize * CHANNELS;
        if self.pixels.len() != expected {
            return Err(PackError::SizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }

        Ok(())
    }
}
