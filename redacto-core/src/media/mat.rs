//! Conversions between `image` RGB buffers and OpenCV matrices.

use image::RgbImage;
use opencv::{
    core::{CV_8UC3, Mat, Scalar},
    prelude::*,
};

/// Copies `image` into a new continuous 3-channel 8-bit Mat, channels in RGB order.
pub fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Copies a continuous 3-channel 8-bit Mat back into an RGB buffer.
pub fn mat_to_rgb(mat: &Mat) -> opencv::Result<RgbImage> {
    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    RgbImage::from_raw(width, height, mat.data_bytes()?.to_vec()).ok_or_else(|| {
        opencv::Error::new(
            opencv::core::StsUnmatchedSizes,
            format!("{}x{} matrix does not hold 8-bit RGB data", width, height),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_pixels_keep_their_position_and_channel_order() {
        let image = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 200]));
        let mat = rgb_to_mat(&image).unwrap();
        assert_eq!((mat.cols(), mat.rows(), mat.channels()), (3, 2, 3));
        assert_eq!(mat_to_rgb(&mat).unwrap(), image);
    }

    #[test]
    fn test_single_channel_mat_is_rejected() {
        let gray = Mat::new_rows_cols_with_default(2, 2, opencv::core::CV_8UC1, Scalar::all(0.0)).unwrap();
        assert!(mat_to_rgb(&gray).is_err());
    }
}
