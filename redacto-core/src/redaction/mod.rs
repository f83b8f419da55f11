//! Region redaction.
//!
//! Applies an irreversible Gaussian blur to every detected region of a frame,
//! in place. Overlapping regions are blurred once per region; blurring an
//! already blurred region is safe. The original pixels are not retained.

pub mod gaussian;

use crate::config::BlurParameters;
use crate::detection::DetectionResult;
use crate::error::{CoreError, CoreResult};
use crate::media::Frame;

pub use gaussian::{BlurError, blur_region};

/// Blurs each detected region of `frame` and returns how many were blurred.
///
/// The kernel size must already be odd; even sizes are rejected rather than
/// corrected here.
pub fn redact(frame: &mut Frame, detections: &DetectionResult, blur: &BlurParameters) -> CoreResult<usize> {
    if !blur.is_valid() {
        return Err(CoreError::Configuration(format!(
            "blur kernel must be odd with a positive sigma, got kernel {} sigma {}",
            blur.kernel_size, blur.sigma
        )));
    }
    if detections.is_empty() {
        return Ok(0);
    }

    let (width, height) = (frame.width(), frame.height());
    let mut blurred = 0;
    for region in detections.regions() {
        // Regions from detectors are clipped already; hand-built results may not be.
        let Some(region) = region.clip(width, height) else {
            continue;
        };
        blur_region(&mut frame.image, &region, blur).map_err(|e| CoreError::Redaction {
            index: frame.index,
            reason: e.to_string(),
        })?;
        blurred += 1;
    }

    log::debug!("Frame {}: blurred {} region(s)", frame.index, blurred);
    Ok(blurred)
}
