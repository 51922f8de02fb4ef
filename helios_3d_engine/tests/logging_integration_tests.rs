//! Integration tests for Engine logging system
//!
//! These tests route engine and resource diagnostics through a custom logger.
//!
//! Run with: cargo test --test logging_integration_tests

use helios_3d_engine::helios3d::Engine;
use helios_3d_engine::helios3d::log::{Logger, LogEntry, LogSeverity};
use helios_3d_engine::helios3d::resource::{
    Image, MemoryTextureBackend, PixelFormat, TextureManager, TextureManagerConfig, TextureType,
};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Engine::log(LogSeverity::Error, "test::module", "Test error message".to_string());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert!(captured.iter().all(|e| e.source == "test::module"));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_detailed_log_keeps_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log_detailed(
        LogSeverity::Error,
        "test::module",
        "Blit failed".to_string(),
        "texture.rs",
        128,
    );

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].file, Some("texture.rs"));
    assert_eq!(captured[0].line, Some(128));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_manual_texture_without_loader_warns() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let mut manager = TextureManager::new(
        TextureManagerConfig::default(),
        Arc::new(MemoryTextureBackend::new()),
        None,
    );
    let handle = manager
        .create_manual("blank", "General", &Default::default(), None)
        .unwrap();
    manager.resources_mut().get_mut(handle).unwrap().load().unwrap();

    let captured = entries.lock().unwrap();
    let warnings: Vec<&LogEntry> = captured
        .iter()
        .filter(|e| e.severity == LogSeverity::Warn && e.source == "helios3d::Resource")
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Texture instance 'blank'"));
    assert!(warnings[0].message.contains("no manual loader was provided"));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_duplicate_texture_logs_error() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let mut manager = TextureManager::new(
        TextureManagerConfig::default(),
        Arc::new(MemoryTextureBackend::new()),
        None,
    );
    let image = Image::from_raw(vec![0u8; 4], 1, 1, PixelFormat::A8R8G8B8).unwrap();
    manager.load_image("pixel", "General", &image, TextureType::TwoD, None, 1.0).unwrap();
    assert!(manager.load_image("pixel", "General", &image, TextureType::TwoD, None, 1.0).is_err());

    let captured = entries.lock().unwrap();
    assert!(captured
        .iter()
        .any(|e| e.severity >= LogSeverity::Warn && e.message.contains("pixel")));
    drop(captured);

    Engine::reset_logger();
}
