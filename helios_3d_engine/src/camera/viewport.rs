/// Viewport - rectangle of a render target a camera draws into.

/// Viewport in pixels with a depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-depth viewport at the origin.
    pub fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height, min_depth: 0.0, max_depth: 1.0 }
    }

    /// Width over height, or `None` for a degenerate viewport.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.height > 0.0).then(|| self.width / self.height)
    }
}
