use tempfile::TempDir;
use tracing::info;

use crate::error::BridgeResult;
use crate::generator::{EcLevel, MatrixGenerator};
use crate::reader::{decode_image, QrDetector};
use crate::render::{render_to_file, RasterConfig};

/// Candidate module sizes the sweep tries, smallest first.
pub const SWEEP_MODULE_SIZES: [u32; 7] = [4, 6, 8, 10, 12, 16, 20];

// Sweep report
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub module_size: u32,
    /// First payload decoded at this size, if any.
    pub decoded: Option<String>,
    /// True when a decoded payload matched the input text exactly.
    pub pass: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    /// Smallest module size the detector read back correctly.
    pub fn first_pass(&self) -> Option<u32> {
        self.outcomes.iter().find(|o| o.pass).map(|o| o.module_size)
    }
}

// Pipeline harness
//------------------------------------------------------------------------------

/// Diagnostic sweep over module sizes: generates the matrix once, then
/// re-rasterizes it into a scoped temp directory and re-decodes it at every
/// candidate size. All candidates are scanned rather than stopping at the
/// first hit, so the report shows the full robustness profile of the
/// rasterizer/detector pair.
pub struct PipelineHarness<'a> {
    generator: &'a dyn MatrixGenerator,
    detector: &'a dyn QrDetector,
    border: u32,
    sizes: Vec<u32>,
}

impl<'a> PipelineHarness<'a> {
    pub fn new(generator: &'a dyn MatrixGenerator, detector: &'a dyn QrDetector) -> Self {
        Self { generator, detector, border: 4, sizes: SWEEP_MODULE_SIZES.to_vec() }
    }

    pub fn border(mut self, modules: u32) -> Self {
        self.border = modules;
        self
    }

    pub fn sizes(mut self, sizes: &[u32]) -> Self {
        self.sizes = sizes.to_vec();
        self
    }

    pub fn run(&self, text: &str, ec: Option<EcLevel>) -> BridgeResult<SweepReport> {
        let matrix = self.generator.generate(text, ec)?;
        let dir = TempDir::new()?;

        let mut report = SweepReport::default();
        for &size in &self.sizes {
            let config = RasterConfig::new().module_size(size).border(self.border);
            let path = dir.path().join(format!("sweep_{size}.png"));
            render_to_file(&matrix, &config, &path)?;

            let results = decode_image(self.detector, &path)?;
            let decoded = results.into_iter().next().map(|r| r.text);
            let pass = decoded.as_deref() == Some(text);
            info!(module_size = size, pass, "sweep step");
            report.outcomes.push(SweepOutcome { module_size: size, decoded, pass });
        }
        Ok(report)
    }
}
