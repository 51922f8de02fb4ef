//! Resource module - lifecycle, registry and textures.
//!
//! `Resource<K>` implements the load/unload/reload/touch state machine,
//! `ResourceManager<K>` owns resources of one kind, and `Texture` is the
//! image-backed kind built on top, with its pixel utilities and storage.

mod resource;
mod resource_manager;
mod pixel;
mod image;
mod texture_storage;
mod texture;
mod texture_manager;

pub use resource::{
    LoadingState, ManualResourceLoader, Resource, ResourceHandle, ResourceKind, ResourceNotifier,
};
pub use resource_manager::{ResourceManager, ResourceManagerConfig, ResourceParams, UsageTracker};
pub use pixel::{
    PixelBox, PixelBoxMut, PixelFormat,
    apply_gamma, bulk_pixel_conversion, memory_size, pack_color, unpack_color,
};
pub use image::{Image, mip_dimensions};
pub use texture_storage::{MemoryTextureBackend, StorageDesc, TextureBackend, TextureStorage};
pub use texture::{ImageSource, Texture, TextureDesc, TextureType, TextureUsage};
pub use texture_manager::{TextureManager, TextureManagerConfig};
