//! Screenshot manifest
//!
//! Every run overwrites a fixed set of PNGs in the screenshot directory.
//! The manifest records each image's dimensions and a content hash in
//! the JSON run report, so a CI log can tell whether the evidence for a
//! given check actually changed between runs.

use std::path::Path;

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::SmokeResult;

/// One captured screenshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub name: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub sha256: String,
}

/// Describe a single PNG on disk
pub fn describe(path: &Path) -> SmokeResult<ScreenshotRecord> {
    let data = std::fs::read(path)?;
    let img = image::load_from_memory(&data)?;
    let (width, height) = img.dimensions();

    let mut hasher = Sha256::new();
    hasher.update(&data);

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ScreenshotRecord {
        name,
        path: path.to_string_lossy().into_owned(),
        width,
        height,
        bytes: data.len() as u64,
        sha256: hex::encode(hasher.finalize()),
    })
}

/// Collect records for every PNG in the screenshot directory, sorted by
/// name. Undecodable files are logged and skipped rather than failing
/// the run; the images themselves are the primary evidence.
pub fn collect(dir: &Path) -> SmokeResult<Vec<ScreenshotRecord>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().map(|e| e == "png").unwrap_or(false) {
            match describe(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_describe_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("homepage.png");
        RgbaImage::new(4, 2).save(&path).unwrap();

        let record = describe(&path).unwrap();
        assert_eq!(record.name, "homepage");
        assert_eq!(record.width, 4);
        assert_eq!(record.height, 2);
        assert!(record.bytes > 0);
        assert_eq!(record.sha256.len(), 64);
    }

    #[test]
    fn test_collect_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::new(1, 1).save(dir.path().join("theme_toggled.png")).unwrap();
        RgbaImage::new(1, 1).save(dir.path().join("homepage.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let records = collect(dir.path()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["homepage", "theme_toggled"]);
    }

    #[test]
    fn test_collect_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let records = collect(&dir.path().join("nope")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_collect_skips_undecodable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), "not a png").unwrap();
        RgbaImage::new(1, 1).save(dir.path().join("prices_loaded.png")).unwrap();

        let records = collect(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "prices_loaded");
    }
}
