/*!
# Helios 3D Engine

Scene-object and resource lifecycle core of the Helios 3D engine.

This crate provides the lazily cached pose model shared by cameras and
lights, the frustum and shadow clip-volume math built on it, and the
load/unload/reload state machine behind every engine resource, with
textures as the image-backed resource kind.

## Architecture

- **SceneNode**: Pose provider; movable objects attach to nodes
- **MovableObject**: Capability trait shared by cameras and lights
- **Camera / Frustum**: View and projection caches, window planes, rays
- **Light**: Derived position/direction, near-clip and frustum clip volumes
- **Resource / ResourceManager**: Lifecycle, handles, memory budget
- **Texture / TextureManager**: Multi-image loading into backend storage
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod math;
pub mod scene;
pub mod camera;
pub mod resource;

// Main helios3d namespace module
pub mod helios3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, format_entry};
    }

    // Math sub-module
    pub mod math {
        pub use crate::math::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
