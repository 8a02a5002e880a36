use anchorage_core::math::Pose;
use anchorage_core::render::{
    Compositor, DisplaySurface, RenderTarget, TextureFormat, View, ViewTargets,
};
use log::trace;

/// Compositor without a window. Hands out numbered texture names and
/// records what was presented.
#[derive(Debug, Default)]
pub struct HeadlessCompositor {
    surface: Option<DisplaySurface>,
    next_texture: u64,
    live_targets: usize,
    allocations: usize,
    presented: Vec<Pose>,
}

impl HeadlessCompositor {
    pub fn new(surface: Option<DisplaySurface>) -> Self {
        Self {
            surface,
            ..Self::default()
        }
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(Some(DisplaySurface {
            width,
            height,
            rotation: 0,
        }))
    }

    pub fn set_surface(&mut self, surface: Option<DisplaySurface>) {
        self.surface = surface;
    }

    /// Target pairs allocated and not yet released.
    pub fn live_targets(&self) -> usize {
        self.live_targets
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Camera poses of every presented view, oldest first.
    pub fn presented(&self) -> &[Pose] {
        &self.presented
    }

    fn target(&mut self, format: TextureFormat, width: u32, height: u32) -> RenderTarget {
        self.next_texture += 1;
        RenderTarget {
            texture: self.next_texture,
            format,
            width,
            height,
        }
    }
}

impl Compositor for HeadlessCompositor {
    fn surface(&self) -> Option<DisplaySurface> {
        self.surface
    }

    fn allocate_targets(&mut self, width: u32, height: u32) -> ViewTargets {
        self.live_targets += 1;
        self.allocations += 1;
        ViewTargets {
            color: self.target(TextureFormat::Rgba8, width, height),
            depth: self.target(TextureFormat::Depth24Stencil8, width, height),
        }
    }

    fn release_targets(&mut self, _targets: ViewTargets) {
        self.live_targets = self.live_targets.saturating_sub(1);
    }

    fn present(&mut self, view: &View) {
        trace!(target: "anchorage_providers::compositor", "present {:?}", view.targets.color.texture);
        self.presented.push(view.pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_get_distinct_textures() {
        let mut compositor = HeadlessCompositor::with_size(640, 480);
        let first = compositor.allocate_targets(640, 480);
        let second = compositor.allocate_targets(640, 480);

        assert_ne!(first.color.texture, first.depth.texture);
        assert_ne!(first.color.texture, second.color.texture);
        assert_eq!(first.depth.format, TextureFormat::Depth24Stencil8);
        assert_eq!(compositor.live_targets(), 2);

        compositor.release_targets(first);
        assert_eq!(compositor.live_targets(), 1);
        assert_eq!(compositor.allocations(), 2);
    }
}
