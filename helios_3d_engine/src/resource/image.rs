/// Image - decoded pixel data for one or more faces and mip levels.
///
/// Data is laid out face-major: all mip levels of face 0 (largest first),
/// then all mip levels of face 1, and so on.

use crate::error::Result;
use super::pixel::{memory_size, PixelBox, PixelFormat};

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    num_faces: u32,
    num_mipmaps: u32,
    data: Vec<u8>,
}

/// Dimensions of mip level `mip` of a `width × height × depth` image.
pub fn mip_dimensions(width: u32, height: u32, depth: u32, mip: u32) -> (u32, u32, u32) {
    let level = |size: u32| size.checked_shr(mip).unwrap_or(0).max(1);
    (level(width), level(height), level(depth))
}

impl Image {
    /// # Errors
    ///
    /// `InvalidArgument` if `num_faces` is 0 or `data` does not match the
    /// size implied by the dimensions, faces and mip count.
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        num_faces: u32,
        num_mipmaps: u32,
        data: Vec<u8>,
    ) -> Result<Self> {
        if num_faces == 0 {
            crate::engine_bail!("helios3d::Image", InvalidArgument => "An image needs at least one face");
        }
        let expected = Self::calculate_size(num_mipmaps, num_faces, width, height, depth, format);
        if data.len() != expected {
            crate::engine_bail!("helios3d::Image", InvalidArgument =>
                "{}x{}x{} {} image with {} faces and {} mipmaps needs {} bytes, got {}",
                width, height, depth, format.name(), num_faces, num_mipmaps, expected, data.len());
        }
        Ok(Self { width, height, depth, format, num_faces, num_mipmaps, data })
    }

    /// Single 2D face without mipmaps.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        Self::new(width, height, 1, format, 1, 0, data)
    }

    /// Bytes needed for every face and mip level.
    pub fn calculate_size(
        num_mipmaps: u32,
        num_faces: u32,
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
    ) -> usize {
        num_faces as usize * Self::face_size(num_mipmaps, width, height, depth, format)
    }

    fn face_size(num_mipmaps: u32, width: u32, height: u32, depth: u32, format: PixelFormat) -> usize {
        (0..=num_mipmaps)
            .map(|mip| {
                let (w, h, d) = mip_dimensions(width, height, depth, mip);
                memory_size(w, h, d, format)
            })
            .sum()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn num_faces(&self) -> u32 {
        self.num_faces
    }

    /// Number of mip levels below the top level.
    pub fn num_mipmaps(&self) -> u32 {
        self.num_mipmaps
    }

    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Pixels of one face at one mip level.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `face` or `mip` is out of range.
    pub fn pixel_box(&self, face: u32, mip: u32) -> Result<PixelBox<'_>> {
        if face >= self.num_faces || mip > self.num_mipmaps {
            crate::engine_bail!("helios3d::Image", InvalidArgument =>
                "Pixel box (face {}, mip {}) out of range ({} faces, {} mipmaps)",
                face, mip, self.num_faces, self.num_mipmaps);
        }

        let face_offset = face as usize
            * Self::face_size(self.num_mipmaps, self.width, self.height, self.depth, self.format);
        let mip_offset: usize = (0..mip)
            .map(|level| {
                let (w, h, d) = mip_dimensions(self.width, self.height, self.depth, level);
                memory_size(w, h, d, self.format)
            })
            .sum();
        let (width, height, depth) = mip_dimensions(self.width, self.height, self.depth, mip);
        let start = face_offset + mip_offset;
        let end = start + memory_size(width, height, depth, self.format);

        Ok(PixelBox {
            width,
            height,
            depth,
            format: self.format,
            data: &self.data[start..end],
        })
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
