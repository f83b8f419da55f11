//! Gaussian blur over a rectangular region of an RGB image.
//!
//! The region is copied out, blurred as a standalone image and written back,
//! so pixels outside it are neither read nor written. With the `opencv`
//! feature the blur is OpenCV's `GaussianBlur` with a square kernel of the
//! configured size and sigma, mirroring samples beyond the region's edges
//! without repeating the edge pixel (`gfedcb|abcdefgh|gfedcba`). Without it,
//! `image`'s Gaussian blur is used; its kernel size follows from sigma alone.

use image::RgbImage;
use image::imageops;

use crate::config::BlurParameters;
use crate::geometry::Region;

#[cfg(feature = "opencv")]
pub type BlurError = opencv::Error;
#[cfg(not(feature = "opencv"))]
pub type BlurError = std::convert::Infallible;

/// Blurs `region` of `image` in place. The region must lie inside the image.
pub fn blur_region(image: &mut RgbImage, region: &Region, blur: &BlurParameters) -> Result<(), BlurError> {
    let (x, y) = (region.x1 as u32, region.y1 as u32);
    let patch = imageops::crop_imm(image, x, y, region.width() as u32, region.height() as u32).to_image();
    let blurred = blur_patch(&patch, blur)?;
    imageops::replace(image, &blurred, i64::from(x), i64::from(y));
    Ok(())
}

#[cfg(feature = "opencv")]
fn blur_patch(patch: &RgbImage, blur: &BlurParameters) -> Result<RgbImage, BlurError> {
    use crate::media::mat::{mat_to_rgb, rgb_to_mat};
    use opencv::core::{Mat, Size};
    use opencv::imgproc;

    let src = rgb_to_mat(patch)?;
    let mut dst = Mat::default();
    let k = blur.kernel_size as i32;
    imgproc::gaussian_blur_def(&src, &mut dst, Size::new(k, k), f64::from(blur.sigma))?;
    mat_to_rgb(&dst)
}

#[cfg(not(feature = "opencv"))]
fn blur_patch(patch: &RgbImage, blur: &BlurParameters) -> Result<RgbImage, BlurError> {
    Ok(imageops::blur(patch, blur.sigma))
}
