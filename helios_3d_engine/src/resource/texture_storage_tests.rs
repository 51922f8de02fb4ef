//! Unit tests for texture_storage.rs
//!
//! Exercises MemoryTextureBackend allocation accounting and level blits.
//! Tests that hit an error path log through the engine logger: #[serial].

use serial_test::serial;
use crate::error::Error;
use crate::resource::{
    MemoryTextureBackend, PixelBox, PixelFormat, StorageDesc, TextureBackend, TextureType,
    TextureUsage,
};

fn desc(width: u32, height: u32, faces: u32, mips: u32, format: PixelFormat) -> StorageDesc {
    StorageDesc {
        texture_type: if faces == 6 { TextureType::CubeMap } else { TextureType::TwoD },
        width,
        height,
        depth: 1,
        num_faces: faces,
        num_mipmaps: mips,
        format,
        usage: TextureUsage::default(),
    }
}

// ============================================================================
// ALLOCATION
// ============================================================================

#[test]
fn test_total_size_counts_faces_and_mips() {
    // 4x4 + 2x2 + 1x1 = 21 pixels per face
    let d = desc(4, 4, 6, 2, PixelFormat::A8R8G8B8);
    assert_eq!(d.total_size(), 6 * 21 * 4);
}

#[test]
fn test_allocated_bytes_follow_storage_lifetime() {
    let backend = MemoryTextureBackend::new();
    assert_eq!(backend.allocated_bytes(), 0);

    let a = backend.create_storage(&desc(8, 8, 1, 0, PixelFormat::R8G8B8A8)).unwrap();
    let b = backend.create_storage(&desc(4, 4, 1, 0, PixelFormat::L8)).unwrap();
    assert_eq!(backend.allocated_bytes(), 256 + 16);

    drop(a);
    assert_eq!(backend.allocated_bytes(), 16);
    drop(b);
    assert_eq!(backend.allocated_bytes(), 0);
}

#[test]
fn test_new_levels_are_zeroed() {
    let backend = MemoryTextureBackend::new();
    let storage = backend.create_storage(&desc(4, 2, 1, 1, PixelFormat::R8G8B8)).unwrap();

    let top = storage.level(0, 0).unwrap();
    assert_eq!((top.width, top.height, top.depth), (4, 2, 1));
    assert_eq!(top.data.len(), 24);
    assert!(top.data.iter().all(|&b| b == 0));

    let mip = storage.level(0, 1).unwrap();
    assert_eq!((mip.width, mip.height), (2, 1));
    assert!(storage.level(0, 2).is_none());
    assert!(storage.level(1, 0).is_none());
}

#[test]
#[serial]
fn test_limit_refuses_oversized_allocation() {
    let backend = MemoryTextureBackend::with_limit(100);
    let small = backend.create_storage(&desc(4, 4, 1, 0, PixelFormat::A8R8G8B8)).unwrap();
    assert_eq!(backend.allocated_bytes(), 64);

    let result = backend.create_storage(&desc(4, 4, 1, 0, PixelFormat::A8R8G8B8));
    assert!(matches!(result, Err(Error::OutOfMemory)));
    assert_eq!(backend.allocated_bytes(), 64);

    drop(small);
    assert!(backend.create_storage(&desc(4, 4, 1, 0, PixelFormat::A8R8G8B8)).is_ok());
}

// ============================================================================
// BLITS
// ============================================================================

#[test]
fn test_blit_same_format_copies_bytes() {
    let backend = MemoryTextureBackend::new();
    let mut storage = backend.create_storage(&desc(2, 1, 1, 0, PixelFormat::R8G8B8A8)).unwrap();

    let pixels = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let src = PixelBox::new(2, 1, 1, PixelFormat::R8G8B8A8, &pixels).unwrap();
    storage.blit_from(0, 0, &src).unwrap();

    assert_eq!(storage.level(0, 0).unwrap().data, &pixels);
}

#[test]
fn test_blit_converts_to_storage_format() {
    let backend = MemoryTextureBackend::new();
    let mut storage = backend.create_storage(&desc(1, 1, 1, 0, PixelFormat::A8R8G8B8)).unwrap();

    let rgba = [10u8, 20, 30, 40];
    let src = PixelBox::new(1, 1, 1, PixelFormat::R8G8B8A8, &rgba).unwrap();
    storage.blit_from(0, 0, &src).unwrap();

    assert_eq!(storage.level(0, 0).unwrap().data, &[40u8, 10, 20, 30]);
}

#[test]
fn test_blit_targets_requested_face() {
    let backend = MemoryTextureBackend::new();
    let mut storage = backend.create_storage(&desc(1, 1, 6, 0, PixelFormat::L8)).unwrap();

    let value = [77u8];
    let src = PixelBox::new(1, 1, 1, PixelFormat::L8, &value).unwrap();
    storage.blit_from(3, 0, &src).unwrap();

    for face in 0..6 {
        let expected: u8 = if face == 3 { 77 } else { 0 };
        assert_eq!(storage.level(face, 0).unwrap().data, &[expected]);
    }
}

#[test]
#[serial]
fn test_blit_rejects_bad_level() {
    let backend = MemoryTextureBackend::new();
    let mut storage = backend.create_storage(&desc(2, 2, 1, 0, PixelFormat::L8)).unwrap();

    let pixels = [0u8; 4];
    let src = PixelBox::new(2, 2, 1, PixelFormat::L8, &pixels).unwrap();
    assert!(matches!(storage.blit_from(1, 0, &src), Err(Error::InvalidArgument(_))));
    assert!(matches!(storage.blit_from(0, 1, &src), Err(Error::InvalidArgument(_))));
}

#[test]
#[serial]
fn test_blit_rejects_dimension_mismatch() {
    let backend = MemoryTextureBackend::new();
    let mut storage = backend.create_storage(&desc(4, 4, 1, 0, PixelFormat::L8)).unwrap();

    let pixels = [0u8; 4];
    let src = PixelBox::new(2, 2, 1, PixelFormat::L8, &pixels).unwrap();
    assert!(matches!(storage.blit_from(0, 0, &src), Err(Error::BackendError(_))));
}

#[test]
fn test_desc_is_kept() {
    let backend = MemoryTextureBackend::new();
    let d = desc(16, 8, 6, 3, PixelFormat::B8G8R8A8);
    let storage = backend.create_storage(&d).unwrap();
    assert_eq!(storage.desc(), &d);
}
