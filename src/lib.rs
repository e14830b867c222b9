//! # qrbridge
//!
//! Glue between an external QR matrix generator, a pixel rasterizer and an
//! in-process QR detector. No QR symbol encoding or decoding happens here:
//! the matrix comes from a subprocess (e.g. `lua` + `qrencode.lua`) speaking
//! a strict textual protocol, and detection is delegated to rqrr. What this
//! crate owns is matrix validation, exact module-square rasterization, batch
//! decoding and a module-size sweep harness for round-trip verification.
//!
//! ## Rasterize a matrix
//!
//! ```rust
//! use qrbridge::{render, Matrix, RasterConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let matrix = Matrix::from_rows(vec![
//!     vec![1, -1, 1],
//!     vec![-1, 1, -1],
//!     vec![1, -1, 1],
//! ])?;
//! let img = render(&matrix, &RasterConfig::new().module_size(10).border(1));
//! assert_eq!(img.dimensions(), (50, 50));
//! # Ok(())
//! # }
//! ```
//!
//! ## Generate through an external encoder and read back
//!
//! ```rust,no_run
//! use qrbridge::{decode_image, render_to_file, MatrixGenerator, ProcessGenerator,
//!     RasterConfig, RqrrDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = ProcessGenerator::new("lua", "qrencode.lua");
//! let matrix = generator.generate("Hello World", None)?;
//! render_to_file(&matrix, &RasterConfig::new(), "hello.png".as_ref())?;
//!
//! let results = decode_image(&RqrrDetector, "hello.png".as_ref())?;
//! assert_eq!(results[0].text, "Hello World");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod harness;
pub mod matrix;
pub mod reader;
pub mod render;

pub use error::{BridgeError, BridgeResult};
pub use generator::{EcLevel, MatrixGenerator, ProcessGenerator, DEFAULT_GENERATION_TIMEOUT};
pub use harness::{PipelineHarness, SweepOutcome, SweepReport, SWEEP_MODULE_SIZES};
pub use matrix::Matrix;
pub use reader::{
    decode_batch, decode_image, BatchReport, DecodeResult, Point, QrDetector, RqrrDetector,
};
pub use render::{render, render_to_file, RasterConfig};
