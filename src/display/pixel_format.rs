// src/display/pixel_format.rs

use serde::{Deserialize, Serialize};

/// The framebuffer a GL peer is asked to provide.
///
/// Zero means "don't care" for every size field. Colour channel sizes are
/// not requested individually; the visual is always RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelFormat {
    pub alpha: u32,
    pub depth: u32,
    pub stencil: u32,
    pub samples: u32,
    pub num_aux_buffers: u32,
    pub accum_bpp: u32,
    pub accum_alpha: u32,
    pub stereo: bool,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self {
            alpha: 0,
            depth: 8,
            stencil: 0,
            samples: 0,
            num_aux_buffers: 0,
            accum_bpp: 0,
            accum_alpha: 0,
            stereo: false,
        }
    }
}

impl PixelFormat {
    pub fn with_alpha(mut self, alpha: u32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_stencil(mut self, stencil: u32) -> Self {
        self.stencil = stencil;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_aux_buffers(mut self, num_aux_buffers: u32) -> Self {
        self.num_aux_buffers = num_aux_buffers;
        self
    }

    pub fn with_accum(mut self, accum_bpp: u32, accum_alpha: u32) -> Self {
        self.accum_bpp = accum_bpp;
        self.accum_alpha = accum_alpha;
        self
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }
}
