// ============================================================================
// redacto-core/src/staging.rs
// ============================================================================
//
// FRAME STAGING: Per-run directory of redacted frames awaiting the encoder
//
// Each run gets its own uniquely named directory (redacto_frames_XXXXXX)
// inside the configured staging base, so concurrent runs never share one.
// Frames are written as lossless PNG, one file per index, named so that the
// encoder's frame_%05d.png input pattern reads them back in index order.
//
// Lifecycle:
// - finish_success removes the directory
// - finish_failure keeps or removes it according to StagingPolicy
// - dropping the area without finishing removes it
//
// AI-ASSISTANT-INFO: Staging area for redacted frames

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tempfile::TempDir;

use crate::config::StagingPolicy;
use crate::error::{CoreError, CoreResult};
use crate::media::Frame;
use crate::temp_files;

/// Prefix of per-run staging directories.
pub const STAGING_PREFIX: &str = "redacto_frames_";

/// ffmpeg image-sequence pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%05d.png";

/// File name of the staged frame with `index`.
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index:05}.png")
}

/// Directory of staged frames for one run.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    staged: BTreeSet<u64>,
    policy: StagingPolicy,
}

impl StagingArea {
    /// Creates a fresh, uniquely named staging directory inside `base`.
    pub fn create(base: &Path, policy: StagingPolicy) -> CoreResult<Self> {
        let dir = temp_files::create_temp_dir(base, STAGING_PREFIX).map_err(|e| {
            CoreError::Staging(format!(
                "failed to create staging directory in {}: {e}",
                base.display()
            ))
        })?;
        log::debug!("Created staging directory {}", dir.path().display());
        Ok(Self {
            dir,
            staged: BTreeSet::new(),
            policy,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Input pattern for the encoder, relative to [`Self::path`].
    pub fn pattern(&self) -> &'static str {
        FRAME_PATTERN
    }

    /// Number of distinct frame indices staged so far.
    pub fn staged_count(&self) -> u64 {
        self.staged.len() as u64
    }

    /// True when the staged indices are exactly `0..staged_count()`.
    pub fn is_contiguous(&self) -> bool {
        self.staged
            .last()
            .is_none_or(|&last| last + 1 == self.staged_count())
    }

    /// Writes `frame` as PNG. Staging the same index again overwrites it.
    pub fn stage(&mut self, frame: &Frame) -> CoreResult<PathBuf> {
        let path = self.dir.path().join(frame_file_name(frame.index));
        frame
            .image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| {
                CoreError::Staging(format!("failed to write {}: {e}", path.display()))
            })?;
        self.staged.insert(frame.index);
        Ok(path)
    }

    /// Removes the staging directory after a successful encode.
    pub fn finish_success(self) -> CoreResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            CoreError::Staging(format!("failed to remove {}: {e}", path.display()))
        })?;
        log::debug!("Removed staging directory {}", path.display());
        Ok(())
    }

    /// Applies the failure policy. Returns the directory if it was retained.
    pub fn finish_failure(self) -> Option<PathBuf> {
        if self.policy.retain_on_failure {
            let path = self.dir.keep();
            log::info!("Staged frames retained for inspection in {}", path.display());
            Some(path)
        } else {
            self.discard();
            None
        }
    }

    /// Removes the directory regardless of policy.
    pub fn discard(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            log::warn!("Failed to remove staging directory {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame(index: u64) -> Frame {
        Frame::new(index, RgbImage::from_pixel(4, 3, Rgb([index as u8, 0, 0])))
    }

    #[test]
    fn test_file_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_00000.png");
        assert_eq!(frame_file_name(42), "frame_00042.png");
        assert_eq!(frame_file_name(123_456), "frame_123456.png");
    }

    #[test]
    fn test_stage_writes_one_png_per_index() {
        let base = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        for i in 0..3 {
            area.stage(&frame(i)).unwrap();
        }
        assert_eq!(area.staged_count(), 3);
        assert!(area.is_contiguous());

        let mut names: Vec<String> = std::fs::read_dir(area.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["frame_00000.png", "frame_00001.png", "frame_00002.png"]);

        let reloaded = image::open(area.path().join("frame_00002.png")).unwrap().to_rgb8();
        assert_eq!(reloaded, frame(2).image);
    }

    #[test]
    fn test_restaging_overwrites() {
        let base = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        area.stage(&frame(0)).unwrap();
        let mut replacement = frame(0);
        replacement.image.put_pixel(0, 0, Rgb([9, 9, 9]));
        area.stage(&replacement).unwrap();

        assert_eq!(area.staged_count(), 1);
        let reloaded = image::open(area.path().join("frame_00000.png")).unwrap().to_rgb8();
        assert_eq!(reloaded.get_pixel(0, 0).0, [9, 9, 9]);
    }

    #[test]
    fn test_write_failure_is_staging_error_naming_the_file() {
        let base = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        std::fs::remove_dir_all(area.path()).unwrap();

        let err = area.stage(&frame(7)).unwrap_err();
        assert!(matches!(err, CoreError::Staging(_)));
        assert!(err.to_string().contains("frame_00007.png"));
        assert_eq!(err.exit_code(), 8);
        assert_eq!(area.staged_count(), 0);
    }

    #[test]
    fn test_gap_is_not_contiguous() {
        let base = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        area.stage(&frame(0)).unwrap();
        area.stage(&frame(2)).unwrap();
        assert!(!area.is_contiguous());
    }

    #[test]
    fn test_success_removes_directory() {
        let base = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        area.stage(&frame(0)).unwrap();
        let path = area.path().to_path_buf();
        area.finish_success().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_failure_policy() {
        let base = tempfile::tempdir().unwrap();

        let area = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        let retained = area.finish_failure().unwrap();
        assert!(retained.is_dir());
        assert!(
            retained
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(STAGING_PREFIX)
        );

        let policy = StagingPolicy {
            retain_on_failure: false,
        };
        let area = StagingArea::create(base.path(), policy).unwrap();
        let path = area.path().to_path_buf();
        assert!(area.finish_failure().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_runs_get_distinct_directories() {
        let base = tempfile::tempdir().unwrap();
        let a = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        let b = StagingArea::create(base.path(), StagingPolicy::default()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
