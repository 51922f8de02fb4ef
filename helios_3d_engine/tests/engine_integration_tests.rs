//! Integration tests for Engine lifecycle and singleton management
//!
//! The engine state is process-global: every test is #[serial].
//!
//! Run with: cargo test --test engine_integration_tests

use helios_3d_engine::helios3d::Engine;
use helios_3d_engine::helios3d::Error;
use helios_3d_engine::helios3d::resource::{
    Image, MemoryTextureBackend, PixelFormat, TextureManager, TextureManagerConfig, TextureType,
};
use std::sync::Arc;
use serial_test::serial;

fn texture_manager(backend: Arc<MemoryTextureBackend>) -> TextureManager {
    TextureManager::new(TextureManagerConfig::default(), backend, None)
}

// ============================================================================
// ENGINE LIFECYCLE TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_engine_full_lifecycle() {
    // Step 1: Initialize engine
    assert!(Engine::initialize().is_ok());
    assert!(Engine::is_initialized());
    Engine::shutdown();

    // Step 2: Register the texture manager
    let backend = Arc::new(MemoryTextureBackend::new());
    assert!(Engine::create_texture_manager(texture_manager(backend.clone())).is_ok());

    // Step 3: Use it through the singleton
    {
        let manager = Engine::texture_manager().unwrap();
        let mut manager = manager.lock().unwrap();
        let image = Image::from_raw(vec![255u8; 16], 2, 2, PixelFormat::A8R8G8B8).unwrap();
        manager
            .load_image("white", "General", &image, TextureType::TwoD, Some(0), 1.0)
            .unwrap();
        assert_eq!(manager.resources().memory_usage(), 16);
    }
    assert_eq!(backend.allocated_bytes(), 16);

    // Step 4: Shutdown drops the manager and frees texture storage
    Engine::shutdown();
    assert!(matches!(Engine::texture_manager(), Err(Error::InitializationFailed(_))));
    assert_eq!(backend.allocated_bytes(), 0);
}

#[test]
#[serial]
fn test_integration_texture_manager_recreate() {
    Engine::initialize().unwrap();
    Engine::shutdown();

    let backend = Arc::new(MemoryTextureBackend::new());
    Engine::create_texture_manager(texture_manager(backend.clone())).unwrap();
    assert!(Engine::create_texture_manager(texture_manager(backend.clone())).is_err());

    Engine::destroy_texture_manager().unwrap();
    assert!(Engine::create_texture_manager(texture_manager(backend)).is_ok());

    Engine::destroy_texture_manager().unwrap();
}

#[test]
#[serial]
fn test_integration_outstanding_handle_outlives_destroy() {
    Engine::initialize().unwrap();
    Engine::shutdown();

    let backend = Arc::new(MemoryTextureBackend::new());
    Engine::create_texture_manager(texture_manager(backend)).unwrap();
    let manager = Engine::texture_manager().unwrap();

    Engine::destroy_texture_manager().unwrap();

    // The Arc keeps the manager usable after the singleton is gone
    assert_eq!(manager.lock().unwrap().default_mipmap_count(), 5);
    assert!(Engine::texture_manager().is_err());
}
