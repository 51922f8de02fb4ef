//! Integration tests for resource lifecycle and texture management
//!
//! These tests go through the engine's texture manager singleton and a
//! custom resource kind, using only the public API. No GPU required: the
//! in-memory texture backend stands in for device storage.
//!
//! Run with: cargo test --test resource_integration_tests

use helios_3d_engine::helios3d::Engine;
use helios_3d_engine::helios3d::resource::{
    Image, ImageSource, LoadingState, ManualResourceLoader, MemoryTextureBackend, PixelFormat,
    Resource, ResourceKind, ResourceManager, ResourceManagerConfig, ResourceParams, Texture,
    TextureDesc, TextureManager, TextureManagerConfig, TextureType,
};
use helios_3d_engine::helios3d::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Decodes nothing: hands out pre-built images by name
struct ImageLibrary {
    images: HashMap<String, Vec<Image>>,
}

impl ImageSource for ImageLibrary {
    fn load_images(&self, name: &str, _group: &str) -> Result<Vec<Image>> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidResource(format!("'{}' is not in the library", name)))
    }
}

fn solid(width: u32, height: u32, value: u8) -> Image {
    Image::from_raw(
        vec![value; (width * height * 4) as usize],
        width,
        height,
        PixelFormat::R8G8B8A8,
    )
    .unwrap()
}

fn library() -> Arc<dyn ImageSource> {
    let mut images = HashMap::new();
    images.insert("grass.png".to_string(), vec![solid(4, 4, 10)]);
    images.insert("rock.png".to_string(), vec![solid(2, 2, 20)]);
    let faces = (0..6).map(|face| solid(2, 2, face as u8 * 40)).collect();
    images.insert("sky.png".to_string(), faces);
    Arc::new(ImageLibrary { images })
}

/// Fresh engine with a texture manager registered
fn setup_engine(config: TextureManagerConfig) -> Arc<MemoryTextureBackend> {
    Engine::initialize().unwrap();
    Engine::shutdown();
    let backend = Arc::new(MemoryTextureBackend::new());
    let manager = TextureManager::new(config, backend.clone(), Some(library()));
    Engine::create_texture_manager(manager).unwrap();
    backend
}

/// Fills a manual texture with a checkerboard of 0x00 / 0xFF pixels
struct CheckerLoader;

impl ManualResourceLoader<Texture> for CheckerLoader {
    fn load_resource(&self, resource: &mut Resource<Texture>) -> Result<()> {
        let texture = resource.kind();
        let (width, height) = (texture.width(), texture.height());
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let value = if (x + y) % 2 == 0 { 0x00u8 } else { 0xFF };
                data.extend_from_slice(&[value; 4]);
            }
        }
        resource.load_image(&Image::from_raw(data, width, height, PixelFormat::A8R8G8B8)?)
    }
}

// ============================================================================
// TEXTURE MANAGER THROUGH THE ENGINE
// ============================================================================

#[test]
#[serial]
fn test_integration_load_texture_through_engine() {
    let backend = setup_engine(TextureManagerConfig::default());
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let handle = manager.load("grass.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();

    let texture = manager.resources().get(handle).unwrap();
    assert_eq!(texture.loading_state(), LoadingState::Loaded);
    assert_eq!(texture.size(), 64);
    assert_eq!((texture.kind().width(), texture.kind().height()), (4, 4));
    assert_eq!(manager.resources().memory_usage(), 64);
    assert!(backend.allocated_bytes() >= 64);

    // Loading again by name returns the same texture
    let again = manager.load("grass.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();
    assert_eq!(again, handle);
    assert_eq!(manager.resources().resource_count(), 1);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_cube_map_from_six_images() {
    setup_engine(TextureManagerConfig::default());
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let handle = manager.load("sky.png", "General", TextureType::CubeMap, Some(0), 1.0).unwrap();
    let texture = manager.resources().get(handle).unwrap();
    assert_eq!(texture.kind().num_faces(), 6);
    assert_eq!(texture.size(), 6 * 2 * 2 * 4);

    // Each face keeps its own pixels
    let face3 = texture.kind().buffer(3, 0).unwrap();
    assert_eq!(face3.data[0], 120);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_memory_budget_evicts_least_recently_used() {
    setup_engine(TextureManagerConfig { memory_budget: 70, ..Default::default() });
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let grass = manager.load("grass.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();
    let rock = manager.load("rock.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();

    // 64 + 16 bytes exceeds the budget: the older texture goes
    assert!(!manager.resources().get(grass).unwrap().is_loaded());
    assert!(manager.resources().get(rock).unwrap().is_loaded());
    assert_eq!(manager.resources().memory_usage(), 16);

    // Loading grass again makes rock the least recently used
    manager.load("grass.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();
    assert!(manager.resources().get(grass).unwrap().is_loaded());
    assert!(!manager.resources().get(rock).unwrap().is_loaded());
    assert_eq!(manager.resources().memory_usage(), 64);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_switching_to_16bit_reloads_textures() {
    setup_engine(TextureManagerConfig::default());
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let handle = manager.load("rock.png", "General", TextureType::TwoD, Some(0), 1.0).unwrap();
    assert_eq!(manager.resources().get(handle).unwrap().size(), 16);

    manager.set_32bit(false).unwrap();

    let texture = manager.resources().get(handle).unwrap();
    assert!(texture.is_loaded());
    assert!(!texture.kind().is_32bit());
    assert_eq!(texture.kind().format().num_elem_bytes(), 2);
    assert_eq!(texture.size(), 8);
    assert_eq!(manager.resources().memory_usage(), 8);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_manual_texture_reloads_through_loader() {
    setup_engine(TextureManagerConfig::default());
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let desc = TextureDesc { width: 2, height: 2, num_mipmaps: 0, ..Default::default() };
    let handle = manager
        .create_manual("checker", "General", &desc, Some(Arc::new(CheckerLoader)))
        .unwrap();

    let texture = manager.resources_mut().get_mut(handle).unwrap();
    assert!(texture.is_manually_loaded());
    assert!(texture.is_reloadable());
    texture.load().unwrap();
    assert!(texture.is_loaded());
    assert_eq!(texture.kind().buffer(0, 0).unwrap().data[4], 0xFF);

    // Unload then reload regenerates the same pixels
    manager.resources_mut().unload(handle).unwrap();
    assert_eq!(manager.resources().memory_usage(), 0);
    let texture = manager.resources_mut().get_by_handle(handle).unwrap();
    assert!(texture.is_loaded());
    assert_eq!(texture.kind().buffer(0, 0).unwrap().data[4], 0xFF);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_unknown_texture_fails_and_stays_unloaded() {
    setup_engine(TextureManagerConfig::default());
    let manager = Engine::texture_manager().unwrap();
    let mut manager = manager.lock().unwrap();

    let result = manager.load("missing.png", "General", TextureType::TwoD, None, 1.0);
    assert!(matches!(result, Err(Error::InvalidResource(_))));

    let texture = manager.resources().get_by_name("missing.png").unwrap();
    assert_eq!(texture.loading_state(), LoadingState::Unloaded);
    assert_eq!(manager.resources().memory_usage(), 0);

    drop(manager);
    Engine::destroy_texture_manager().unwrap();
}

// ============================================================================
// CUSTOM RESOURCE KIND
// ============================================================================

/// Shader source held in memory while loaded
#[derive(Default)]
struct ShaderSource {
    entry_point: String,
    text: Option<String>,
}

impl ResourceKind for ShaderSource {
    const RESOURCE_TYPE: &'static str = "Shader";

    fn load_impl(&mut self, name: &str, group: &str) -> Result<()> {
        self.text = Some(format!("// {}/{}\nfn {}() {{}}", group, name, self.entry_point));
        Ok(())
    }

    fn unload_impl(&mut self) {
        self.text = None;
    }

    fn calculate_size(&self) -> usize {
        self.text.as_ref().map_or(0, String::len)
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if name == "entry_point" {
            self.entry_point = value.to_string();
            return true;
        }
        false
    }
}

#[test]
#[serial]
fn test_integration_custom_resource_kind_lifecycle() {
    let mut shaders = ResourceManager::new(ResourceManagerConfig::default(), ShaderSource::default);
    assert_eq!(shaders.resource_type(), "Shader");

    let mut params = ResourceParams::default();
    params.insert("entry_point".to_string(), "main_vs".to_string());
    params.insert("unknown_key".to_string(), "ignored".to_string());
    let handle = shaders.create("basic.vert", "Shaders", false, None, Some(&params)).unwrap();

    shaders.load("basic.vert", "Shaders").unwrap();
    let shader = shaders.get(handle).unwrap();
    assert!(shader.kind().text.as_ref().unwrap().contains("main_vs"));
    assert_eq!(shaders.memory_usage(), shader.size());

    shaders.unload_all();
    assert_eq!(shaders.memory_usage(), 0);

    shaders.reload_all().unwrap();
    assert!(!shaders.get(handle).unwrap().is_loaded());

    shaders.remove_by_name("basic.vert").unwrap();
    assert!(!shaders.resource_exists("basic.vert"));
    assert!(matches!(shaders.remove(handle), Err(Error::InvalidResource(_))));
}
