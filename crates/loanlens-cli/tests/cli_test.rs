//! Runs the `loanlens` binary against local storage and a directory sink.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

fn loanlens(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_loanlens"))
        .current_dir(workdir)
        .args(args)
        .env_clear()
        .env("RUST_LOG", "off")
        .env("STORAGE_BACKEND", "local")
        .env("LOCAL_STORAGE_PATH", workdir.join("blobs"))
        .env("LOCAL_STORAGE_BASE_URL", "http://localhost:3000/media")
        .env("SUBMISSION_DIR", workdir.join("submissions"))
        .output()
        .expect("run loanlens")
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])))
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

fn record_count(workdir: &Path) -> usize {
    std::fs::read_dir(workdir.join("submissions"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Run a full capture session for loan LN-1 and return the parsed report.
fn capture(dir: &Path, photo: &Path) -> serde_json::Value {
    let media = dir.join("media");
    let output = loanlens(
        dir,
        &[
            "capture",
            "--photo",
            photo.to_str().unwrap(),
            "--lat",
            "12.97",
            "--lon",
            "77.59",
            "--loan-id",
            "LN-1",
            "--requirement-id",
            "R-7",
            "--requirement-name",
            "Shop Photo",
            "--user",
            "u1",
            "--media-dir",
            media.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stored_blob(dir: &Path, report: &serde_json::Value) -> PathBuf {
    let media_url = report["submission"]["mediaUrl"].as_str().unwrap();
    let key = media_url
        .strip_prefix("http://localhost:3000/media/")
        .unwrap();
    assert!(key.starts_with("loan-evidence/u1/"));
    dir.join("blobs").join(key)
}

#[test]
fn capture_watermarks_with_bundled_font() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("shop.jpg");
    write_jpeg(&photo, 320, 240);

    let report = capture(dir.path(), &photo);
    assert_eq!(report["watermarked"], true);

    let submission = &report["submission"];
    assert_eq!(submission["assetName"], "Shop Photo");
    assert_eq!(submission["remarks"], "Requirement: R-7");
    assert_eq!(submission["location"]["latitude"], 12.97);

    let stored = std::fs::read(stored_blob(dir.path(), &report)).unwrap();
    assert_ne!(stored, std::fs::read(&photo).unwrap());
    let img = image::load_from_memory(&stored).unwrap();
    assert_eq!(img.dimensions(), (320, 240));
    assert_eq!(record_count(dir.path()), 1);
}

#[test]
fn undecodable_photo_is_submitted_raw() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("shop.jpg");
    std::fs::write(&photo, b"raw sensor bytes").unwrap();

    let report = capture(dir.path(), &photo);
    assert_eq!(report["watermarked"], false);
    assert_eq!(
        std::fs::read(stored_blob(dir.path(), &report)).unwrap(),
        b"raw sensor bytes"
    );
    assert_eq!(record_count(dir.path()), 1);
}

#[test]
fn denied_location_blocks_submission() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("shop.jpg");
    std::fs::write(&photo, b"raw").unwrap();

    let output = loanlens(
        dir.path(),
        &[
            "capture",
            "--photo",
            photo.to_str().unwrap(),
            "--deny-location",
            "--media-dir",
            dir.path().join("media").to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Grant location access"));
    assert_eq!(record_count(dir.path()), 0);
}

#[test]
fn watermark_command_renders_onto_file() {
    let dir = TempDir::new().unwrap();
    write_jpeg(&dir.path().join("in.jpg"), 400, 300);

    let output = loanlens(
        dir.path(),
        &[
            "watermark",
            "--photo",
            "in.jpg",
            "--out",
            "out.jpg",
            "--lat",
            "-1.5",
            "--lon",
            "36.8",
            "--timezone",
            "UTC",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = image::open(dir.path().join("out.jpg")).unwrap().to_rgb8();
    assert_eq!(out.dimensions(), (400, 300));
    assert!(out.get_pixel(12, 300 - 14)[0] < 130);
}

#[test]
fn watermark_rejects_unknown_timezone() {
    let dir = TempDir::new().unwrap();
    write_jpeg(&dir.path().join("in.jpg"), 10, 10);

    let output = loanlens(
        dir.path(),
        &[
            "watermark", "--photo", "in.jpg", "--out", "out.jpg", "--lat", "1", "--lon", "2",
            "--timezone", "Mars/Olympus",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown timezone"));
    assert!(!dir.path().join("out.jpg").exists());
}
