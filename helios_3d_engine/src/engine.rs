/// Helios3D Engine - Singleton manager for engine subsystems
///
/// This module provides global singleton management for the texture manager
/// and the engine logger. It uses thread-safe static storage with RwLock for
/// safe concurrent access.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::resource::TextureManager;
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Texture manager singleton
    texture_manager: RwLock<Option<Arc<Mutex<TextureManager>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            texture_manager: RwLock::new(None),
        }
    }
}

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// Manages the lifecycle of the global subsystems (texture manager, logger)
/// using a singleton pattern with thread-safe access.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use helios_3d_engine::helios3d::Engine;
/// use helios_3d_engine::helios3d::resource::{
///     MemoryTextureBackend, TextureManager, TextureManagerConfig,
/// };
///
/// Engine::initialize()?;
/// let backend = Arc::new(MemoryTextureBackend::new());
/// Engine::create_texture_manager(
///     TextureManager::new(TextureManagerConfig::default(), backend, None),
/// )?;
///
/// let textures = Engine::texture_manager()?;
///
/// Engine::shutdown();
/// # Ok::<(), helios_3d_engine::helios3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("helios3d::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("helios3d::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("helios3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before creating any subsystems.
    /// Calling it again is harmless.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Whether `initialize()` has been called
    pub fn is_initialized() -> bool {
        ENGINE_STATE.get().is_some()
    }

    /// Shutdown the engine and destroy all singletons
    ///
    /// Dropping the texture manager force-unloads every texture it still owns.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut tm) = state.texture_manager.write() {
                *tm = None;
            }
        }
    }

    // ===== TEXTURE MANAGER API =====

    /// Register a texture manager as the global singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A texture manager already exists
    /// - The texture manager lock is poisoned
    pub fn create_texture_manager(manager: TextureManager) -> Result<()> {
        let state = Self::state()?;

        let mut lock = state.texture_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureManager lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("TextureManager already exists. Call Engine::destroy_texture_manager() first.".to_string())
            ));
        }

        *lock = Some(Arc::new(Mutex::new(manager)));

        crate::engine_info!("helios3d::Engine", "TextureManager singleton created successfully");

        Ok(())
    }

    /// Get the texture manager singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or the texture
    /// manager has not been created.
    pub fn texture_manager() -> Result<Arc<Mutex<TextureManager>>> {
        let state = Self::state()?;

        let lock = state.texture_manager.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureManager lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("TextureManager not created. Call Engine::create_texture_manager() first.".to_string())
            ))
    }

    /// Destroy the texture manager singleton
    ///
    /// Existing `Arc` references stay valid until dropped.
    pub fn destroy_texture_manager() -> Result<()> {
        let state = Self::state()?;

        let mut lock = state.texture_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureManager lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("helios3d::Engine", "TextureManager singleton destroyed");

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, test capture, etc.)
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! and engine_err! to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
