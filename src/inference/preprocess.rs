use image::imageops::FilterType;
use std::path::Path;
use tch::Tensor;

/// Spatial side length the model expects.
pub const INPUT_SIDE: i64 = 299;
pub const INPUT_CHANNELS: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("failed to read stored image: {0}")]
    Io(#[from] std::io::Error),
    #[error("uploaded bytes are not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decodes uploaded bytes into the model's input tensor: 299x299 RGB with
/// every channel value scaled from [0,255] to [0.0,1.0], plus a leading
/// batch axis of size 1. Raw RGB8 rows are height-major, so the flat buffer
/// is already NHWC once the batch axis is added.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<Tensor, PreprocessError> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = decoded
        .resize_exact(INPUT_SIDE as u32, INPUT_SIDE as u32, FilterType::Triangle)
        .to_rgb8();
    let scaled: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();
    Ok(Tensor::from_slice(&scaled).view([1, INPUT_SIDE, INPUT_SIDE, INPUT_CHANNELS]))
}

pub fn preprocess_file(path: &Path) -> Result<Tensor, PreprocessError> {
    let bytes = std::fs::read(path)?;
    preprocess_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::new(width, height);
        img.put_pixel(0, 0, Rgb([255, 0, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn output_shape_has_batch_axis() {
        let tensor = preprocess_bytes(&png_bytes(64, 48)).unwrap();
        assert_eq!(tensor.size(), vec![1, 299, 299, 3]);
    }

    #[test]
    fn values_scaled_to_unit_interval() {
        let tensor = preprocess_bytes(&png_bytes(10, 10)).unwrap();
        let min = tensor.min().double_value(&[]);
        let max = tensor.max().double_value(&[]);
        assert!(min >= 0.0);
        assert!(max <= 1.0);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = preprocess_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }
}
