use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …).
pub fn load_image_from_bytes(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    Ok(image::load_from_memory(data)?)
}

/// Grayscale → Otsu binarization → one 3×3 dilation pass.
pub fn preprocess(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    dilate(&binarize(&gray))
}

/// Two-level image: pixels above the Otsu level become white, the rest black.
fn binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// L∞ radius 1 is the 3×3 rectangular structuring element.
fn dilate(binary: &GrayImage) -> GrayImage {
    imageproc::morphology::dilate(binary, Norm::LInf, 1)
}

/// Serialize a preprocessed raster as PNG for backends that read files.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
