/// Canvas size tracker. The window loop feeds physical sizes in; consumers
/// read the aspect ratio and clamped pixel ratio back out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizes {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

/// Upper bound for the reported pixel ratio.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

impl Default for Sizes {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

impl Sizes {
    pub fn new(width: u32, height: u32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: scale_factor.min(MAX_PIXEL_RATIO),
        }
    }

    /// Returns `true` when the size actually changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.pixel_ratio = scale_factor.min(MAX_PIXEL_RATIO);
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Minimised windows report a zero extent; nothing should be rendered then.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
