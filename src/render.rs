use std::path::Path;

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::error::BridgeResult;
use crate::matrix::Matrix;

// Raster config
//------------------------------------------------------------------------------

/// Pixel geometry and colors for rasterizing a matrix.
///
/// Defaults match what common detectors expect: 10 px modules, a four
/// module quiet zone, black on white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterConfig {
    module_size: u32,
    border: u32,
    dark: Luma<u8>,
    light: Luma<u8>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { module_size: 10, border: 4, dark: Luma([0]), light: Luma([255]) }
    }
}

impl RasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side length of one module in pixels, at least one.
    pub fn module_size(mut self, px: u32) -> Self {
        debug_assert!(px >= 1, "module size must be at least one pixel");
        self.module_size = px.max(1);
        self
    }

    /// Quiet zone width in modules.
    pub fn border(mut self, modules: u32) -> Self {
        self.border = modules;
        self
    }

    pub fn colors(mut self, dark: Luma<u8>, light: Luma<u8>) -> Self {
        self.dark = dark;
        self.light = light;
        self
    }

    /// Side length in pixels of the image for an `n`-module matrix.
    pub fn image_size(&self, n: usize) -> u32 {
        (n as u32 + 2 * self.border) * self.module_size
    }
}

// Rasterizer
//------------------------------------------------------------------------------

/// Paints every dark module as an exact integer-aligned filled square at
/// `((col + border) * module_size, (row + border) * module_size)`. Light
/// modules and the quiet zone stay at the canvas fill. No anti-aliasing and
/// no sub-pixel placement; detectors key on hard module boundaries.
pub fn render(matrix: &Matrix, config: &RasterConfig) -> GrayImage {
    let n = matrix.size();
    let m = config.module_size;
    let total = config.image_size(n);

    let mut canvas = GrayImage::from_pixel(total, total, config.light);
    for r in 0..n {
        for c in 0..n {
            if !matrix.is_dark(r, c) {
                continue;
            }
            let x = (c as u32 + config.border) * m;
            let y = (r as u32 + config.border) * m;
            let module = Rect::at(x as i32, y as i32).of_size(m, m);
            draw_filled_rect_mut(&mut canvas, module, config.dark);
        }
    }
    canvas
}

/// Rasterizes and writes the image to `path`. Use a lossless extension such
/// as `.png`; lossy formats smear module edges and break decoding.
pub fn render_to_file(matrix: &Matrix, config: &RasterConfig, path: &Path) -> BridgeResult<()> {
    let img = render(matrix, config);
    debug!(side = img.width(), path = %path.display(), "writing rasterized matrix");
    img.save(path)?;
    Ok(())
}
