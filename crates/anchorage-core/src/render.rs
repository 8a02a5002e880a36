use crate::math::Pose;

/// Smallest texture edge handed to the host.
pub const MIN_TEXTURE_EDGE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySurface {
    pub width: u32,
    pub height: u32,
    /// Display rotation in quarter turns, as reported by the platform.
    pub rotation: i32,
}

impl DisplaySurface {
    /// Texture size for this surface, clamped to [`MIN_TEXTURE_EDGE`].
    pub fn texture_size(&self) -> (u32, u32) {
        (
            self.width.max(MIN_TEXTURE_EDGE),
            self.height.max(MIN_TEXTURE_EDGE),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Depth24Stencil8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Compositor-defined texture name.
    pub texture: u64,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTargets {
    pub color: RenderTarget,
    pub depth: RenderTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub pose: Pose,
    /// Column-major.
    pub projection: [f32; 16],
    pub targets: ViewTargets,
    pub depth_near_z: f32,
    pub depth_far_z: f32,
    pub is_first_person_observer: bool,
    pub requires_app_clear: bool,
}

/// Owner of the host's render surface. Draws the camera background and the
/// host's output once a frame is finished.
pub trait Compositor {
    /// `None` until the platform has handed over a window.
    fn surface(&self) -> Option<DisplaySurface>;
    fn allocate_targets(&mut self, width: u32, height: u32) -> ViewTargets;
    fn release_targets(&mut self, targets: ViewTargets);
    fn present(&mut self, view: &View);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_size_is_clamped() {
        let surface = DisplaySurface {
            width: 4,
            height: 1080,
            rotation: 0,
        };
        assert_eq!(surface.texture_size(), (8, 1080));
        assert_eq!(DisplaySurface::default().texture_size(), (8, 8));
    }
}
