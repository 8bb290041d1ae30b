use anyhow::Context;
use image::{DynamicImage, ImageDecoder, ImageReader, metadata::Orientation};
use preprocess::DecodedImage;
use std::path::Path;

/// Decode an image file into upright RGB8, applying its EXIF orientation.
pub fn open_image(path: &Path) -> anyhow::Result<DecodedImage> {
    let mut decoder = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()?
        .into_decoder()
        .with_context(|| format!("Unsupported image {}", path.display()))?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let image = DynamicImage::from_decoder(decoder)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        orientation = ?orientation,
        width = image.width(),
        height = image.height(),
        "Image decoded"
    );

    Ok(upright(image, orientation))
}

fn upright(mut image: DynamicImage, orientation: Orientation) -> DecodedImage {
    image.apply_orientation(orientation);
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    DecodedImage::new(width, height, rgb.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    /// 2x1 image: red on the left, blue on the right
    fn red_blue() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn rotated_photo_is_turned_upright() {
        let decoded = upright(red_blue(), Orientation::Rotate90);

        assert_eq!((decoded.width(), decoded.height()), (1, 2));
        assert_eq!(decoded.pixel(0, 0), Some([255, 0, 0]));
        assert_eq!(decoded.pixel(0, 1), Some([0, 0, 255]));
    }

    #[test]
    fn unrotated_photo_is_unchanged() {
        let decoded = upright(red_blue(), Orientation::NoTransforms);

        assert_eq!((decoded.width(), decoded.height()), (2, 1));
        assert_eq!(decoded.pixels(), &[255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn opens_png_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grain.png");
        red_blue().save(&path).unwrap();

        let decoded = open_image(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 1));
        assert_eq!(decoded.pixel(1, 0), Some([0, 0, 255]));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(open_image(&dir.path().join("absent.jpg")).is_err());
    }
}
