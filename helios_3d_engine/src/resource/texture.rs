/// Texture - the image-backed resource kind.
///
/// A `Texture` describes the texture (type, size, format, mipmaps, gamma,
/// usage) and owns its backing `TextureStorage` while loaded. Pixel data
/// comes from a list of `Image`s: either fetched through an `ImageSource`
/// for file-backed textures, or handed in directly with `load_image`,
/// `load_images` and `load_raw_data`.

use std::sync::Arc;
use bitflags::bitflags;
use crate::error::Result;
use super::image::Image;
use super::pixel::{apply_gamma, memory_size, PixelBox, PixelFormat};
use super::resource::{LoadingState, Resource, ResourceKind};
use super::texture_storage::{StorageDesc, TextureBackend, TextureStorage};

// ===== ENUMS AND FLAGS =====

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    OneD,
    #[default]
    TwoD,
    ThreeD,
    /// Six 2D faces: +X, -X, +Y, -Y, +Z, -Z
    CubeMap,
}

impl TextureType {
    /// Number of faces a texture of this type holds
    pub fn face_count(self) -> u32 {
        match self {
            TextureType::CubeMap => 6,
            _ => 1,
        }
    }
}

bitflags! {
    /// How the texture will be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const STATIC        = 1 << 0;
        const DYNAMIC       = 1 << 1;
        const WRITE_ONLY    = 1 << 2;
        /// Mip levels below the top are generated, not uploaded
        const AUTO_MIPMAP   = 1 << 3;
        const RENDER_TARGET = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        TextureUsage::STATIC | TextureUsage::WRITE_ONLY | TextureUsage::AUTO_MIPMAP
    }
}

// ===== DESCRIPTORS =====

/// Descriptor for a manually created texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    /// Texture type (1D, 2D, 3D, cube map)
    pub texture_type: TextureType,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Depth in pixels (1 unless 3D)
    pub depth: u32,
    /// Mip levels below the top level
    pub num_mipmaps: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            texture_type: TextureType::TwoD,
            width: 512,
            height: 512,
            depth: 1,
            num_mipmaps: 0,
            format: PixelFormat::A8R8G8B8,
            usage: TextureUsage::default(),
        }
    }
}

/// Supplies decoded images for file-backed textures
pub trait ImageSource: Send + Sync {
    /// Images making up the named texture (one per face, or one in total)
    fn load_images(&self, name: &str, group: &str) -> Result<Vec<Image>>;
}

// ===== TEXTURE =====

/// Texture payload of a `Resource<Texture>`
pub struct Texture {
    texture_type: TextureType,
    width: u32,
    height: u32,
    depth: u32,
    src_width: u32,
    src_height: u32,
    src_depth: u32,
    format: PixelFormat,
    src_format: PixelFormat,
    /// Overrides the source-derived format when set
    desired_format: Option<PixelFormat>,
    is_32bit: bool,
    mipmap_count: u32,
    requested_mipmap_count: u32,
    gamma: f32,
    usage: TextureUsage,
    treat_luminance_as_alpha: bool,
    has_alpha: bool,
    backend: Arc<dyn TextureBackend>,
    source: Option<Arc<dyn ImageSource>>,
    storage: Option<Box<dyn TextureStorage>>,
}

impl Texture {
    /// 512x512 2D `A8R8G8B8` texture without mipmaps, allocating through `backend`
    pub fn new(backend: Arc<dyn TextureBackend>) -> Self {
        Self {
            texture_type: TextureType::TwoD,
            width: 512,
            height: 512,
            depth: 1,
            src_width: 0,
            src_height: 0,
            src_depth: 0,
            format: PixelFormat::A8R8G8B8,
            src_format: PixelFormat::A8R8G8B8,
            desired_format: None,
            is_32bit: true,
            mipmap_count: 0,
            requested_mipmap_count: 0,
            gamma: 1.0,
            usage: TextureUsage::default(),
            treat_luminance_as_alpha: false,
            has_alpha: false,
            backend,
            source: None,
            storage: None,
        }
    }

    /// Texture that fetches its images from `source` when loaded
    pub fn with_source(mut self, source: Option<Arc<dyn ImageSource>>) -> Self {
        self.source = source;
        self
    }

    /// Apply the shape of a manual texture descriptor
    pub fn apply_desc(&mut self, desc: &TextureDesc) {
        self.texture_type = desc.texture_type;
        self.width = desc.width;
        self.height = desc.height;
        self.depth = desc.depth;
        self.src_width = desc.width;
        self.src_height = desc.height;
        self.src_depth = desc.depth;
        self.set_mipmap_count(desc.num_mipmaps);
        self.format = desc.format;
        self.src_format = desc.format;
        self.usage = desc.usage;
        self.has_alpha = desc.format.has_alpha();
    }

    // ===== ACCESSORS =====

    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    pub fn set_texture_type(&mut self, texture_type: TextureType) {
        self.texture_type = texture_type;
    }

    /// 6 for cube maps, 1 otherwise
    pub fn num_faces(&self) -> u32 {
        self.texture_type.face_count()
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

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        self.src_width = width;
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        self.src_height = height;
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
        self.src_depth = depth;
    }

    /// Dimensions of the source image last loaded
    pub fn src_dimensions(&self) -> (u32, u32, u32) {
        (self.src_width, self.src_height, self.src_depth)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
        self.src_format = format;
        self.has_alpha = format.has_alpha();
    }

    pub fn src_format(&self) -> PixelFormat {
        self.src_format
    }

    pub fn desired_format(&self) -> Option<PixelFormat> {
        self.desired_format
    }

    pub fn set_desired_format(&mut self, format: Option<PixelFormat>) {
        self.desired_format = format;
    }

    pub fn is_32bit(&self) -> bool {
        self.is_32bit
    }

    /// Choose between 32-bit and 16-bit storage for integer formats
    pub fn set_32bit(&mut self, enabled: bool) {
        self.is_32bit = enabled;
    }

    /// Mip levels below the top level
    pub fn mipmap_count(&self) -> u32 {
        self.mipmap_count
    }

    /// Mip count asked for by the user (the loaded count may differ)
    pub fn requested_mipmap_count(&self) -> u32 {
        self.requested_mipmap_count
    }

    pub fn set_mipmap_count(&mut self, count: u32) {
        self.mipmap_count = count;
        self.requested_mipmap_count = count;
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn set_gamma(&mut self, gamma: f32) {
        self.gamma = gamma;
    }

    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn set_usage(&mut self, usage: TextureUsage) {
        self.usage = usage;
    }

    pub fn treat_luminance_as_alpha(&self) -> bool {
        self.treat_luminance_as_alpha
    }

    /// Load `L8` sources as `A8`
    pub fn set_treat_luminance_as_alpha(&mut self, enabled: bool) {
        self.treat_luminance_as_alpha = enabled;
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn image_source(&self) -> Option<&Arc<dyn ImageSource>> {
        self.source.as_ref()
    }

    pub fn set_image_source(&mut self, source: Option<Arc<dyn ImageSource>>) {
        self.source = source;
    }

    // ===== STORAGE =====

    /// Allocate backing storage for the current description (no-op if allocated)
    pub fn create_internal_resources(&mut self) -> Result<()> {
        if self.storage.is_some() {
            return Ok(());
        }
        let desc = StorageDesc {
            texture_type: self.texture_type,
            width: self.width,
            height: self.height,
            depth: self.depth,
            num_faces: self.num_faces(),
            num_mipmaps: self.mipmap_count,
            format: self.format,
            usage: self.usage,
        };
        self.storage = Some(self.backend.create_storage(&desc)?);
        Ok(())
    }

    /// Release the backing storage (no-op if none)
    pub fn free_internal_resources(&mut self) {
        self.storage = None;
    }

    pub fn has_internal_resources(&self) -> bool {
        self.storage.is_some()
    }

    /// Contents of one face/mip level of the backing storage
    pub fn buffer(&self, face: u32, mip: u32) -> Option<PixelBox<'_>> {
        self.storage.as_ref()?.level(face, mip)
    }

    pub fn storage(&self) -> Option<&dyn TextureStorage> {
        self.storage.as_deref()
    }

    /// Writable backing storage, for loaders that blit levels themselves
    pub fn storage_mut(&mut self) -> Option<&mut (dyn TextureStorage + 'static)> {
        self.storage.as_deref_mut()
    }

    // ===== IMAGE LOADING =====

    /// Fill the texture from `images`.
    ///
    /// With several images each one becomes a face; with a single image its
    /// own faces are used. Custom mipmaps in the first image replace the
    /// configured mip count and disable automatic generation.
    ///
    /// # Errors
    ///
    /// `EmptyInput` if `images` is empty; layout and storage errors propagate.
    pub fn load_images(&mut self, name: &str, images: &[Image]) -> Result<()> {
        let Some(first) = images.first() else {
            crate::engine_bail!("helios3d::Texture", EmptyInput =>
                "Cannot load texture '{}' from an empty image list", name);
        };

        self.free_internal_resources();

        self.src_width = first.width();
        self.src_height = first.height();
        self.src_depth = first.depth();
        self.width = self.src_width;
        self.height = self.src_height;
        self.depth = self.src_depth;

        self.src_format = first.format();
        if self.treat_luminance_as_alpha && self.src_format == PixelFormat::L8 {
            self.src_format = PixelFormat::A8;
        }
        self.format = match self.desired_format {
            Some(format) => format,
            None if self.is_32bit => self.src_format,
            None => self.src_format.downgrade_to_16bit(),
        };
        self.has_alpha = self.src_format.has_alpha();

        let image_mips = first.num_mipmaps();
        if image_mips > 0 {
            self.mipmap_count = image_mips;
            self.usage.remove(TextureUsage::AUTO_MIPMAP);
        }

        let result = self
            .create_internal_resources()
            .and_then(|()| self.upload_images(name, images));
        if result.is_err() {
            // A half-filled texture keeps no storage
            self.free_internal_resources();
        }
        result
    }

    /// Blit every face and mip of `images` into the allocated storage.
    fn upload_images(&mut self, name: &str, images: &[Image]) -> Result<()> {
        let Some(first) = images.first() else {
            return Ok(());
        };
        let image_mips = first.num_mipmaps();

        let multi_image = images.len() > 1;
        let available = if multi_image { images.len() as u32 } else { first.num_faces() };
        let faces = available.min(self.num_faces());

        crate::engine_debug!("helios3d::Texture",
            "Texture '{}': loading {} face(s) ({}, {}x{}x{}) with {} from {}; internal format is {}",
            name, faces, first.format().name(), first.width(), first.height(), first.depth(),
            if self.usage.contains(TextureUsage::AUTO_MIPMAP) {
                format!("{} generated mipmaps", self.mipmap_count)
            } else {
                format!("{} custom mipmaps", self.mipmap_count)
            },
            if multi_image { "multiple images" } else { "an image" },
            self.format.name());

        let gamma = self.gamma;
        let has_alpha = self.has_alpha;
        let Some(storage) = self.storage.as_mut() else {
            crate::engine_bail!("helios3d::Texture", "Texture '{}' has no backing storage", name);
        };

        for mip in 0..=image_mips {
            for face in 0..faces {
                let mut src = if multi_image {
                    images[face as usize].pixel_box(0, mip)?
                } else {
                    first.pixel_box(face, mip)?
                };
                if !multi_image && has_alpha && src.format == PixelFormat::L8 {
                    src.format = PixelFormat::A8;
                }

                if gamma != 1.0 {
                    // Correct a copy, never the source image
                    let mut scratch = src.data.to_vec();
                    apply_gamma(&mut scratch, gamma, src.format);
                    let corrected = PixelBox { data: &scratch, ..src };
                    storage.blit_from(face, mip, &corrected)?;
                } else {
                    storage.blit_from(face, mip, &src)?;
                }
            }
        }
        Ok(())
    }
}

impl ResourceKind for Texture {
    const RESOURCE_TYPE: &'static str = "Texture";

    fn load_impl(&mut self, name: &str, group: &str) -> Result<()> {
        let Some(source) = self.source.clone() else {
            crate::engine_bail!("helios3d::Texture", InvalidResource =>
                "Texture '{}' in group '{}' has no image source to load from", name, group);
        };
        let images = source.load_images(name, group)?;
        self.load_images(name, &images)
    }

    fn unload_impl(&mut self) {
        self.free_internal_resources();
    }

    fn calculate_size(&self) -> usize {
        self.num_faces() as usize * memory_size(self.width, self.height, self.depth, self.format)
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        match name {
            "num_mipmaps" => value.parse().map(|count| self.set_mipmap_count(count)).is_ok(),
            "gamma" => value.parse().map(|gamma| self.gamma = gamma).is_ok(),
            "treat_luminance_as_alpha" => value.parse()
                .map(|enabled| self.treat_luminance_as_alpha = enabled)
                .is_ok(),
            "texture_type" => {
                let texture_type = match value {
                    "1d" => TextureType::OneD,
                    "2d" => TextureType::TwoD,
                    "3d" => TextureType::ThreeD,
                    "cubic" => TextureType::CubeMap,
                    _ => return false,
                };
                self.texture_type = texture_type;
                true
            }
            _ => false,
        }
    }
}

// ===== RESOURCE-LEVEL LOADING =====

impl Resource<Texture> {
    /// Load the texture from a single image (its faces become the texture's faces).
    pub fn load_image(&mut self, image: &Image) -> Result<()> {
        self.load_images(std::slice::from_ref(image))
    }

    /// Load the texture from already decoded images.
    ///
    /// Does nothing if the texture is already loaded. Called from a manual
    /// loader (state `Loading`), only the pixel data is filled and the
    /// surrounding `load` completes the transition.
    pub fn load_images(&mut self, images: &[Image]) -> Result<()> {
        match self.loading_state() {
            LoadingState::Loading => {
                let name = self.name().to_string();
                return self.kind_mut().load_images(&name, images);
            }
            LoadingState::Unloaded => {}
            LoadingState::Loaded | LoadingState::Unloading => return Ok(()),
        }

        self.set_loading_state(LoadingState::Loading);
        let name = self.name().to_string();
        if let Err(error) = self.kind_mut().load_images(&name, images) {
            self.set_loading_state(LoadingState::Unloaded);
            return Err(error);
        }
        self.finish_external_load();
        Ok(())
    }

    /// Load the texture from raw pixels of a single 2D image.
    pub fn load_raw_data(&mut self, data: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<()> {
        let image = Image::from_raw(data.to_vec(), width, height, format)?;
        self.load_image(&image)
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
