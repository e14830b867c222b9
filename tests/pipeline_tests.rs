use std::fs;
use std::path::PathBuf;

use test_case::test_case;

use qrbridge::{
    decode_batch, decode_image, render, render_to_file, BridgeError, BridgeResult, EcLevel,
    Matrix, MatrixGenerator, PipelineHarness, QrDetector, RasterConfig, RqrrDetector,
    SWEEP_MODULE_SIZES,
};

/// Real module matrix from the qrcode crate, converted to the generator's
/// sign convention (positive dark, negative light).
fn fixture_matrix(text: &str) -> Matrix {
    let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
    let n = code.width();
    let colors = code.to_colors();
    let rows = (0..n)
        .map(|r| {
            (0..n)
                .map(|c| if colors[r * n + c] == qrcode::Color::Dark { 1 } else { -1 })
                .collect()
        })
        .collect();
    Matrix::from_rows(rows).unwrap()
}

struct FixtureGenerator;

impl MatrixGenerator for FixtureGenerator {
    fn generate(&self, text: &str, _ec: Option<EcLevel>) -> BridgeResult<Matrix> {
        Ok(fixture_matrix(text))
    }
}

fn write_qr(dir: &std::path::Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    render_to_file(&fixture_matrix(text), &RasterConfig::new().module_size(6), &path).unwrap();
    path
}

#[test_case("Hello World"; "ascii")]
#[test_case("test123"; "alphanumeric")]
#[test_case("https://example.com/?q=qr"; "url")]
fn roundtrip_in_memory(text: &str) {
    let img = render(&fixture_matrix(text), &RasterConfig::new().module_size(6).border(4));
    let results = RqrrDetector.detect(&img);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, text);
    assert!(results[0].corners.is_some());
}

#[test]
fn roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_qr(dir.path(), "roundtrip.png", "Hello World");

    let results = decode_image(&RqrrDetector, &path).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "Hello World");
}

#[test]
fn batch_skips_missing_and_decodes_rest() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        dir.path().join("not_there.png"),
        write_qr(dir.path(), "present.png", "batch payload"),
    ];

    let report = decode_batch(&RqrrDetector, &paths, None).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.decoded.len(), 1);
    assert_eq!(report.decoded[0].1.text, "batch payload");
}

#[test]
fn batch_writes_sink_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write_qr(dir.path(), "first.png", "first payload"),
        write_qr(dir.path(), "second.png", "second payload"),
    ];
    let sink = dir.path().join("decoded.txt");

    decode_batch(&RqrrDetector, &paths, Some(&sink)).unwrap();
    let contents = fs::read_to_string(&sink).unwrap();
    assert_eq!(contents, "first payload\nsecond payload\n");
}

#[test]
fn batch_with_nothing_decodable_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let blank = dir.path().join("blank.png");
    image::GrayImage::from_pixel(64, 64, image::Luma([255])).save(&blank).unwrap();
    let paths = vec![dir.path().join("not_there.png"), blank];

    let err = decode_batch(&RqrrDetector, &paths, None).unwrap_err();
    assert!(matches!(err, BridgeError::DecodeEmpty));
}

#[test]
fn harness_finds_a_working_module_size() {
    let generator = FixtureGenerator;
    let detector = RqrrDetector;
    let report = PipelineHarness::new(&generator, &detector).run("test123", None).unwrap();

    assert_eq!(report.outcomes.len(), SWEEP_MODULE_SIZES.len());
    assert!(report.first_pass().is_some());
    for outcome in &report.outcomes {
        if outcome.pass {
            assert_eq!(outcome.decoded.as_deref(), Some("test123"));
        }
    }
}
