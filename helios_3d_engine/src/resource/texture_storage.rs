/// Texture storage - the backing store textures upload their pixels into.
///
/// A `TextureBackend` allocates one `TextureStorage` per loaded texture.
/// Storage holds every face and mip level and converts incoming pixels to
/// its own format on blit.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::error::{Error, Result};
use super::image::mip_dimensions;
use super::pixel::{bulk_pixel_conversion, memory_size, PixelBox, PixelBoxMut, PixelFormat};
use super::texture::{TextureType, TextureUsage};

// ===== STORAGE DESC =====

/// Descriptor for allocating texture storage
#[derive(Debug, Clone, PartialEq)]
pub struct StorageDesc {
    /// Texture type (1D, 2D, 3D, cube map)
    pub texture_type: TextureType,
    /// Width of the top level in pixels
    pub width: u32,
    /// Height of the top level in pixels
    pub height: u32,
    /// Depth of the top level in pixels (1 unless 3D)
    pub depth: u32,
    /// Number of faces (6 for cube maps)
    pub num_faces: u32,
    /// Number of mip levels below the top level
    pub num_mipmaps: u32,
    /// Storage pixel format
    pub format: PixelFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

impl StorageDesc {
    /// Bytes needed for every face and level.
    pub fn total_size(&self) -> usize {
        let face: usize = (0..=self.num_mipmaps)
            .map(|mip| {
                let (w, h, d) = mip_dimensions(self.width, self.height, self.depth, mip);
                memory_size(w, h, d, self.format)
            })
            .sum();
        face * self.num_faces as usize
    }
}

// ===== TRAITS =====

/// Allocated storage for one texture.
///
/// Released when dropped.
pub trait TextureStorage: Send + Sync {
    fn desc(&self) -> &StorageDesc;

    /// Upload `src` into one face/mip level, converting its format.
    fn blit_from(&mut self, face: u32, mip: u32, src: &PixelBox) -> Result<()>;

    /// Current contents of one face/mip level.
    fn level(&self, face: u32, mip: u32) -> Option<PixelBox<'_>>;
}

/// Allocator for texture storage
pub trait TextureBackend: Send + Sync {
    fn create_storage(&self, desc: &StorageDesc) -> Result<Box<dyn TextureStorage>>;
}

// ===== MEMORY BACKEND =====

/// CPU-memory texture backend.
///
/// Tracks the bytes held by all live storages, and optionally refuses
/// allocations above a limit.
#[derive(Debug, Default)]
pub struct MemoryTextureBackend {
    allocated: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl MemoryTextureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that fails with `OutOfMemory` past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self { allocated: Arc::default(), limit: Some(limit) }
    }

    /// Bytes currently held by live storages.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }
}

impl TextureBackend for MemoryTextureBackend {
    fn create_storage(&self, desc: &StorageDesc) -> Result<Box<dyn TextureStorage>> {
        let size = desc.total_size();
        if let Some(limit) = self.limit {
            if self.allocated_bytes() + size > limit {
                crate::engine_error!("helios3d::MemoryTextureBackend",
                    "Cannot allocate {} bytes: {} of {} in use", size, self.allocated_bytes(), limit);
                return Err(Error::OutOfMemory);
            }
        }

        let mut levels = Vec::with_capacity((desc.num_faces * (desc.num_mipmaps + 1)) as usize);
        for _face in 0..desc.num_faces {
            for mip in 0..=desc.num_mipmaps {
                let (w, h, d) = mip_dimensions(desc.width, desc.height, desc.depth, mip);
                levels.push(vec![0u8; memory_size(w, h, d, desc.format)]);
            }
        }

        self.allocated.fetch_add(size, Ordering::AcqRel);
        Ok(Box::new(MemoryTextureStorage {
            desc: desc.clone(),
            levels,
            size,
            allocated: self.allocated.clone(),
        }))
    }
}

struct MemoryTextureStorage {
    desc: StorageDesc,
    /// Face-major: `face * (num_mipmaps + 1) + mip`
    levels: Vec<Vec<u8>>,
    size: usize,
    allocated: Arc<AtomicUsize>,
}

impl MemoryTextureStorage {
    fn level_index(&self, face: u32, mip: u32) -> Option<usize> {
        (face < self.desc.num_faces && mip <= self.desc.num_mipmaps)
            .then(|| (face * (self.desc.num_mipmaps + 1) + mip) as usize)
    }
}

impl TextureStorage for MemoryTextureStorage {
    fn desc(&self) -> &StorageDesc {
        &self.desc
    }

    fn blit_from(&mut self, face: u32, mip: u32, src: &PixelBox) -> Result<()> {
        let Some(index) = self.level_index(face, mip) else {
            crate::engine_bail!("helios3d::MemoryTextureBackend", InvalidArgument =>
                "No level (face {}, mip {}) in storage with {} faces and {} mipmaps",
                face, mip, self.desc.num_faces, self.desc.num_mipmaps);
        };

        let (width, height, depth) = mip_dimensions(self.desc.width, self.desc.height, self.desc.depth, mip);
        if (src.width, src.height, src.depth) != (width, height, depth) {
            crate::engine_bail!("helios3d::MemoryTextureBackend",
                "Blit of {}x{}x{} pixels into a {}x{}x{} level is not supported (no scaling)",
                src.width, src.height, src.depth, width, height, depth);
        }

        let format = self.desc.format;
        let mut dst = PixelBoxMut::new(width, height, depth, format, &mut self.levels[index])?;
        bulk_pixel_conversion(src, &mut dst)
    }

    fn level(&self, face: u32, mip: u32) -> Option<PixelBox<'_>> {
        let index = self.level_index(face, mip)?;
        let (width, height, depth) = mip_dimensions(self.desc.width, self.desc.height, self.desc.depth, mip);
        Some(PixelBox {
            width,
            height,
            depth,
            format: self.desc.format,
            data: &self.levels[index],
        })
    }
}

impl Drop for MemoryTextureStorage {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.size, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[path = "texture_storage_tests.rs"]
mod tests;
