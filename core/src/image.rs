use crate::{CoreError, Result};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// Channel layout of a raw 8-bit pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray,
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

/// Immutable 8-bit RGBA image shared between pipeline stages.
///
/// Cloning only bumps a reference count; the pixels are never written after
/// construction, so a stage holding a clone can never observe another stage's
/// edits.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Image {
    pub const CHANNELS: usize = 4;

    /// Wraps a raw buffer, expanding gray or RGB input to RGBA.
    pub fn from_raw(width: u32, height: u32, layout: PixelLayout, data: &[u8]) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(layout.channels()))
            .ok_or_else(|| {
                CoreError::InvalidBuffer(format!("{width}x{height} {layout:?} image is too large"))
            })?;
        if data.len() != expected {
            return Err(CoreError::InvalidBuffer(format!(
                "{width}x{height} {layout:?} buffer needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let pixels: Vec<u8> = match layout {
            PixelLayout::Rgba => data.to_vec(),
            PixelLayout::Rgb => data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            PixelLayout::Gray => data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        };

        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Arc::from(Vec::new()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row-major RGBA bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec())
    }

    /// True when both handles point at the same pixel allocation.
    pub fn shares_pixels(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl From<RgbaImage> for Image {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw().into(),
        }
    }
}

impl From<&RgbaImage> for Image {
    fn from(img: &RgbaImage) -> Self {
        Self::from(img.clone())
    }
}

impl From<&RgbImage> for Image {
    fn from(img: &RgbImage) -> Self {
        Self::from(DynamicImage::ImageRgb8(img.clone()).to_rgba8())
    }
}

impl From<&GrayImage> for Image {
    fn from(img: &GrayImage) -> Self {
        Self::from(DynamicImage::ImageLuma8(img.clone()).to_rgba8())
    }
}

impl From<&DynamicImage> for Image {
    fn from(img: &DynamicImage) -> Self {
        Self::from(img.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn gray_buffer_expands_to_rgba() {
        let img = Image::from_raw(2, 1, PixelLayout::Gray, &[10, 200]).unwrap();
        assert_eq!(img.as_raw(), &[10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn rgb_buffer_gets_opaque_alpha() {
        let img = Image::from_raw(1, 1, PixelLayout::Rgb, &[1, 2, 3]).unwrap();
        assert_eq!(img.as_raw(), &[1, 2, 3, 255]);
    }

    #[test]
    fn wrong_buffer_length_is_rejected() {
        let err = Image::from_raw(4, 4, PixelLayout::Rgba, &[0; 10]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBuffer(_)));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let err = Image::from_raw(1 << 31, 1 << 31, PixelLayout::Rgba, &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBuffer(_)));
        let err = Image::from_raw(u32::MAX, u32::MAX, PixelLayout::Gray, &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBuffer(_)));
    }

    #[test]
    fn zero_sized_image_is_empty() {
        assert!(Image::empty().is_empty());
        let img = Image::from_raw(0, 0, PixelLayout::Rgba, &[]).unwrap();
        assert!(img.is_empty());
    }

    #[test]
    fn clones_share_pixels() {
        let mut gray = GrayImage::new(8, 8);
        gray.put_pixel(3, 3, Luma([255]));
        let a = Image::from(&gray);
        let b = a.clone();
        assert!(a.shares_pixels(&b));
        assert_eq!(b.to_rgba_image().unwrap().get_pixel(3, 3).0, [255, 255, 255, 255]);
    }
}
