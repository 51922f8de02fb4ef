/// Texture manager - the `ResourceManager<Texture>` front end.
///
/// Holds the texture backend and image source handed to every texture it
/// creates, and the defaults applied to them (mip count, bit depth).

use std::sync::Arc;
use crate::error::Result;
use super::image::Image;
use super::pixel::PixelFormat;
use super::resource::{ManualResourceLoader, ResourceHandle};
use super::resource_manager::{ResourceManager, ResourceManagerConfig};
use super::texture::{ImageSource, Texture, TextureDesc, TextureType};
use super::texture_storage::TextureBackend;

/// Texture manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureManagerConfig {
    /// Mip levels given to textures loaded without an explicit count
    pub default_mipmap_count: u32,
    /// Keep integer formats at 32 bits (false downgrades to 16-bit formats)
    pub is_32bit: bool,
    /// Bytes of loaded texture data before eviction starts
    pub memory_budget: usize,
}

impl Default for TextureManagerConfig {
    fn default() -> Self {
        Self {
            default_mipmap_count: 5,
            is_32bit: true,
            memory_budget: usize::MAX,
        }
    }
}

/// Creates, loads and tracks textures
pub struct TextureManager {
    resources: ResourceManager<Texture>,
    backend: Arc<dyn TextureBackend>,
    default_mipmap_count: u32,
    is_32bit: bool,
}

impl TextureManager {
    /// Create a texture manager
    ///
    /// # Arguments
    ///
    /// * `config` - Defaults and memory budget
    /// * `backend` - Allocates the storage of every texture
    /// * `source` - Provides images for file-backed textures (`load`)
    pub fn new(
        config: TextureManagerConfig,
        backend: Arc<dyn TextureBackend>,
        source: Option<Arc<dyn ImageSource>>,
    ) -> Self {
        let factory_backend = backend.clone();
        let resources = ResourceManager::new(
            ResourceManagerConfig { memory_budget: config.memory_budget },
            move || Texture::new(factory_backend.clone()).with_source(source.clone()),
        );
        Self {
            resources,
            backend,
            default_mipmap_count: config.default_mipmap_count,
            is_32bit: config.is_32bit,
        }
    }

    pub fn resources(&self) -> &ResourceManager<Texture> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager<Texture> {
        &mut self.resources
    }

    pub fn backend(&self) -> &Arc<dyn TextureBackend> {
        &self.backend
    }

    // ===== DEFAULTS =====

    pub fn default_mipmap_count(&self) -> u32 {
        self.default_mipmap_count
    }

    /// Applies to textures created from now on
    pub fn set_default_mipmap_count(&mut self, count: u32) {
        self.default_mipmap_count = count;
    }

    pub fn is_32bit(&self) -> bool {
        self.is_32bit
    }

    /// Switch bit depth for every texture.
    ///
    /// Loaded reloadable textures are reloaded with the new depth; the others
    /// only record it for their next load.
    pub fn set_32bit(&mut self, enabled: bool) -> Result<()> {
        self.is_32bit = enabled;
        let handles: Vec<ResourceHandle> = self.resources.handles().collect();
        for handle in handles {
            let Some(texture) = self.resources.get_mut(handle) else { continue };
            if texture.is_loaded() && texture.is_reloadable() {
                texture.unload();
                texture.kind_mut().set_32bit(enabled);
                texture.load()?;
            } else {
                texture.kind_mut().set_32bit(enabled);
            }
        }
        Ok(())
    }

    fn configure(&mut self, handle: ResourceHandle, texture_type: TextureType, mipmaps: Option<u32>, gamma: f32) {
        let mipmaps = mipmaps.unwrap_or(self.default_mipmap_count);
        let is_32bit = self.is_32bit;
        if let Some(texture) = self.resources.get_mut(handle) {
            let kind = texture.kind_mut();
            kind.set_texture_type(texture_type);
            kind.set_mipmap_count(mipmaps);
            kind.set_gamma(gamma);
            kind.set_32bit(is_32bit);
        }
    }

    // ===== CREATION AND LOADING =====

    /// Create a blank manual texture and allocate its storage.
    ///
    /// Its data comes from `loader` on `load`; without a loader the storage
    /// can still be filled directly but the texture is not reloadable.
    pub fn create_manual(
        &mut self,
        name: &str,
        group: &str,
        desc: &TextureDesc,
        loader: Option<Arc<dyn ManualResourceLoader<Texture>>>,
    ) -> Result<ResourceHandle> {
        let handle = self.resources.create(name, group, true, loader, None)?;
        let is_32bit = self.is_32bit;
        if let Some(texture) = self.resources.get_mut(handle) {
            let kind = texture.kind_mut();
            kind.apply_desc(desc);
            kind.set_32bit(is_32bit);
            kind.create_internal_resources()?;
        }
        Ok(handle)
    }

    /// Load a file-backed texture through the image source.
    ///
    /// An existing texture of that name is loaded as is; a new one is
    /// created with the given type, mip count (`None` = default) and gamma.
    pub fn load(
        &mut self,
        name: &str,
        group: &str,
        texture_type: TextureType,
        mipmaps: Option<u32>,
        gamma: f32,
    ) -> Result<ResourceHandle> {
        let (handle, created) = self.resources.create_or_retrieve(name, group, false, None, None)?;
        if created {
            self.configure(handle, texture_type, mipmaps, gamma);
        }
        self.resources.load_handle(handle)?;
        Ok(handle)
    }

    /// Create a texture from an already decoded image.
    ///
    /// The texture has no loader, so it is not reloadable. If loading fails
    /// the texture is removed again.
    pub fn load_image(
        &mut self,
        name: &str,
        group: &str,
        image: &Image,
        texture_type: TextureType,
        mipmaps: Option<u32>,
        gamma: f32,
    ) -> Result<ResourceHandle> {
        let handle = self.resources.create(name, group, true, None, None)?;
        self.configure(handle, texture_type, mipmaps, gamma);
        let loaded = match self.resources.get_mut(handle) {
            Some(texture) => texture.load_image(image).and_then(|()| texture.touch()),
            None => Ok(()),
        };
        if let Err(error) = loaded {
            // Nothing can reload it, so free the name for a retry
            self.resources.remove(handle)?;
            return Err(error);
        }
        self.resources.check_usage();
        Ok(handle)
    }

    /// Create a 2D texture from raw pixels
    #[allow(clippy::too_many_arguments)]
    pub fn load_raw_data(
        &mut self,
        name: &str,
        group: &str,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        mipmaps: Option<u32>,
        gamma: f32,
    ) -> Result<ResourceHandle> {
        let image = Image::from_raw(data.to_vec(), width, height, format)?;
        self.load_image(name, group, &image, TextureType::TwoD, mipmaps, gamma)
    }
}

#[cfg(test)]
#[path = "texture_manager_tests.rs"]
mod tests;
