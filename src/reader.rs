use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::GrayImage;
use tracing::{debug, warn};

use crate::error::{BridgeError, BridgeResult};

// Decode result
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One decoded payload plus the detector's corner estimate, if it gave one.
/// Corners are in image coordinates, in the order the detector reports
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    pub text: String,
    pub corners: Option<[Point; 4]>,
}

// Detector
//------------------------------------------------------------------------------

/// Capability seam over the detection primitive. One call per image, no
/// retry or preprocessing cascade; an empty result means "no code found",
/// not an error.
pub trait QrDetector {
    fn detect(&self, img: &GrayImage) -> Vec<DecodeResult>;
}

/// In-process detector backed by rqrr.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDetector;

impl QrDetector for RqrrDetector {
    fn detect(&self, img: &GrayImage) -> Vec<DecodeResult> {
        let (w, h) = img.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            w as usize,
            h as usize,
            |x, y| img.get_pixel(x as u32, y as u32).0[0],
        );

        let mut results = Vec::new();
        for grid in prepared.detect_grids() {
            let corners = grid.bounds.map(|p| Point { x: p.x as i32, y: p.y as i32 });
            match grid.decode() {
                Ok((_meta, text)) if !text.is_empty() => {
                    results.push(DecodeResult { text, corners: Some(corners) });
                }
                Ok(_) => {}
                Err(e) => debug!("grid located but not decodable: {e}"),
            }
        }
        results
    }
}

// Decoding
//------------------------------------------------------------------------------

/// Loads one image and runs the detector once over it. Missing or
/// unreadable files surface as [`BridgeError::Load`].
pub fn decode_image(detector: &dyn QrDetector, path: &Path) -> BridgeResult<Vec<DecodeResult>> {
    let img = image::open(path)
        .map_err(|source| BridgeError::Load { path: path.to_path_buf(), source })?
        .to_luma8();
    Ok(detector.detect(&img))
}

/// Outcome of a batch decode, in input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Every decoded payload paired with the image it came from.
    pub decoded: Vec<(PathBuf, DecodeResult)>,
    /// Images skipped because they were missing or unreadable.
    pub skipped: usize,
}

/// Decodes a list of images, skipping unreadable ones with a diagnostic.
/// When `sink` is given, every payload is appended to it as one UTF-8 line,
/// in input order. A batch in which nothing decodes at all is
/// [`BridgeError::DecodeEmpty`].
pub fn decode_batch(
    detector: &dyn QrDetector,
    paths: &[PathBuf],
    sink: Option<&Path>,
) -> BridgeResult<BatchReport> {
    let mut report = BatchReport::default();

    for path in paths {
        let results = match decode_image(detector, path) {
            Ok(results) => results,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                report.skipped += 1;
                continue;
            }
        };
        if results.is_empty() {
            debug!("no QR code found in {}", path.display());
        }
        report.decoded.extend(results.into_iter().map(|r| (path.clone(), r)));
    }

    if let Some(sink) = sink {
        let mut out = BufWriter::new(File::create(sink)?);
        for (_, result) in &report.decoded {
            writeln!(out, "{}", result.text)?;
        }
        out.flush()?;
    }

    if report.decoded.is_empty() {
        return Err(BridgeError::DecodeEmpty);
    }
    Ok(report)
}

#[cfg(test)]
mod reader_tests {
    use image::{GrayImage, Luma};

    use super::{decode_image, QrDetector, RqrrDetector};
    use crate::error::BridgeError;

    #[test]
    fn test_blank_image_has_no_codes() {
        let img = GrayImage::from_pixel(64, 64, Luma([255]));
        assert!(RqrrDetector.detect(&img).is_empty());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = decode_image(&RqrrDetector, std::path::Path::new("no/such/image.png"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Load { .. }));
    }
}
