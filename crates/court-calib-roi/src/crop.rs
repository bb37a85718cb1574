//! Cropping a frame to the ROI and mapping detector output back.

use court_calib_core::{FrameSize, ModelWorldLandmark, PoseLandmark};
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::RoiError;
use crate::roi::{validate_roi, Roi};

/// Pose models degrade below this input size.
pub const MIN_CROP_PX: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropOptions {
    /// Minimum crop width and height in pixels.
    pub min_crop_px: u32,
    /// Resize the crop to this `[width, height]` before handing it to the
    /// model.
    pub target_size: Option<[u32; 2]>,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            min_crop_px: MIN_CROP_PX,
            target_size: None,
        }
    }
}

/// Pixel geometry of one crop. Valid for one frame only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CroppedFrameData {
    pub offset_x: u32,
    pub offset_y: u32,
    pub cropped_width: u32,
    pub cropped_height: u32,
    pub original_width: u32,
    pub original_height: u32,
    /// Model input pixels per crop pixel; `1.0` without resizing.
    pub scale_x: f64,
    pub scale_y: f64,
}

impl CroppedFrameData {
    pub fn original_frame(&self) -> FrameSize {
        FrameSize::new(self.original_width, self.original_height)
    }

    /// The region actually cropped, normalized to the full frame.
    pub fn region(&self) -> Roi {
        let w = self.original_width as f64;
        let h = self.original_height as f64;
        Roi::new(
            self.offset_x as f64 / w,
            self.offset_y as f64 / h,
            self.cropped_width as f64 / w,
            self.cropped_height as f64 / h,
        )
    }
}

/// Pixel rectangle `(x, y, w, h)` for `roi` in a `width × height` frame.
///
/// Extents below `min_px` are expanded symmetrically about the ROI center;
/// the result is shifted back inside the frame when that overflows.
pub fn crop_rect(width: u32, height: u32, roi: &Roi, min_px: u32) -> Result<(u32, u32, u32, u32), RoiError> {
    if width == 0 || height == 0 {
        return Err(RoiError::EmptyFrame { width, height });
    }
    if width < min_px || height < min_px {
        return Err(RoiError::FrameTooSmall {
            width,
            height,
            min: min_px,
        });
    }
    let roi = validate_roi(*roi);
    let (x, w) = axis_span(roi.x, roi.width, width, min_px);
    let (y, h) = axis_span(roi.y, roi.height, height, min_px);
    Ok((x, y, w, h))
}

fn axis_span(origin: f64, extent: f64, full: u32, min_px: u32) -> (u32, u32) {
    let full_f = full as f64;
    let center = (origin + extent / 2.0) * full_f;
    let size = (extent * full_f).round().clamp(min_px as f64, full_f);
    let start = (center - size / 2.0).round().clamp(0.0, full_f - size);
    (start as u32, size as u32)
}

/// Crop `frame` to `roi` into `scratch`, resizing to the model input size
/// when one is configured.
///
/// `scratch` is reused across frames; it is reallocated only when the crop
/// size changes. Zero-sized frames and frames smaller than the minimum crop
/// are errors, every other ROI problem is corrected.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip(frame, scratch), fields(w = frame.width(), h = frame.height()))
)]
pub fn crop_video_frame(
    frame: &RgbImage,
    roi: &Roi,
    scratch: &mut RgbImage,
    options: &CropOptions,
) -> Result<CroppedFrameData, RoiError> {
    let (width, height) = frame.dimensions();
    let (x, y, w, h) = crop_rect(width, height, roi, options.min_crop_px)?;

    if scratch.dimensions() != (w, h) {
        *scratch = RgbImage::new(w, h);
    }
    for (dx, dy, px) in scratch.enumerate_pixels_mut() {
        *px = *frame.get_pixel(x + dx, y + dy);
    }

    let (mut scale_x, mut scale_y) = (1.0, 1.0);
    if let Some([tw, th]) = options.target_size {
        if tw == 0 || th == 0 {
            return Err(RoiError::InvalidTargetSize {
                width: tw,
                height: th,
            });
        }
        if (tw, th) != (w, h) {
            let resized = imageops::resize(&*scratch, tw, th, imageops::FilterType::Triangle);
            *scratch = resized;
            scale_x = tw as f64 / w as f64;
            scale_y = th as f64 / h as f64;
        }
    }

    Ok(CroppedFrameData {
        offset_x: x,
        offset_y: y,
        cropped_width: w,
        cropped_height: h,
        original_width: width,
        original_height: height,
        scale_x,
        scale_y,
    })
}

/// Detector output remapped to full-frame normalized coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FullFrameLandmarks {
    pub landmarks: Vec<PoseLandmark>,
    /// The model's own metric-ish space; independent of the crop.
    pub world_landmarks: Vec<ModelWorldLandmark>,
}

/// `full = (crop_norm · crop_px + offset) / full_px` for each 2-D landmark.
///
/// Depth and visibility are kept; world landmarks pass through unchanged.
pub fn transform_landmarks_to_full_frame(
    landmarks: &[PoseLandmark],
    world_landmarks: &[ModelWorldLandmark],
    crop: &CroppedFrameData,
) -> FullFrameLandmarks {
    let fw = crop.original_width.max(1) as f64;
    let fh = crop.original_height.max(1) as f64;
    let cw = crop.cropped_width as f64;
    let ch = crop.cropped_height as f64;

    let landmarks = landmarks
        .iter()
        .map(|lm| PoseLandmark {
            x: (lm.x * cw + crop.offset_x as f64) / fw,
            y: (lm.y * ch + crop.offset_y as f64) / fh,
            ..*lm
        })
        .collect();

    FullFrameLandmarks {
        landmarks,
        world_landmarks: world_landmarks.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]))
    }

    #[test]
    fn remaps_crop_landmark_to_full_frame() {
        let crop = CroppedFrameData {
            offset_x: 100,
            offset_y: 50,
            cropped_width: 200,
            cropped_height: 150,
            original_width: 1920,
            original_height: 1080,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        let lm = PoseLandmark::new(0.5, 0.5, -0.3, 0.8);
        let world = ModelWorldLandmark {
            x: 0.1,
            y: -0.2,
            z: 0.05,
            visibility: 0.8,
        };
        let out = transform_landmarks_to_full_frame(&[lm], &[world], &crop);
        // (100 + 100) / 1920, (50 + 75) / 1080
        assert_abs_diff_eq!(out.landmarks[0].x, 200.0 / 1920.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.landmarks[0].y, 125.0 / 1080.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.landmarks[0].x, 0.104, epsilon = 5e-4);
        assert_eq!(out.landmarks[0].z, -0.3);
        assert_eq!(out.landmarks[0].visibility, 0.8);
        assert_eq!(out.world_landmarks, vec![world]);
    }

    #[test]
    fn tiny_roi_is_expanded_to_minimum_crop() {
        let frame = gradient(640, 480);
        let mut scratch = RgbImage::new(1, 1);
        let roi = Roi::new(0.5, 0.5, 0.05, 0.05); // 32x24 px
        let data = crop_video_frame(&frame, &roi, &mut scratch, &CropOptions::default()).expect("crop");
        assert!(data.cropped_width >= MIN_CROP_PX && data.cropped_height >= MIN_CROP_PX);
        assert_eq!(scratch.dimensions(), (data.cropped_width, data.cropped_height));

        // expansion is centered on the original ROI (center at 336, 252)
        let cx = data.offset_x as f64 + data.cropped_width as f64 / 2.0;
        let cy = data.offset_y as f64 + data.cropped_height as f64 / 2.0;
        assert!((cx - 336.0).abs() <= 1.0 && (cy - 252.0).abs() <= 1.0);

        let p = scratch.get_pixel(0, 0);
        assert_eq!(p.0[0], (data.offset_x % 256) as u8);
        assert_eq!(p.0[1], (data.offset_y % 256) as u8);
    }

    #[test]
    fn minimum_crop_near_corner_stays_in_frame() {
        let frame = gradient(320, 240);
        let mut scratch = RgbImage::new(1, 1);
        let roi = Roi::new(0.99, 0.99, 0.01, 0.01);
        let data = crop_video_frame(&frame, &roi, &mut scratch, &CropOptions::default()).expect("crop");
        assert_eq!((data.cropped_width, data.cropped_height), (MIN_CROP_PX, MIN_CROP_PX));
        assert!(data.offset_x + data.cropped_width <= 320);
        assert!(data.offset_y + data.cropped_height <= 240);
    }

    #[test]
    fn resize_to_model_input_reports_scale() {
        let frame = gradient(640, 480);
        let mut scratch = RgbImage::new(1, 1);
        let opts = CropOptions {
            target_size: Some([256, 256]),
            ..CropOptions::default()
        };
        let roi = Roi::new(0.25, 0.25, 0.2, 0.2); // 128x96
        let data = crop_video_frame(&frame, &roi, &mut scratch, &opts).expect("crop");
        assert_eq!(scratch.dimensions(), (256, 256));
        assert_abs_diff_eq!(data.scale_x, 256.0 / data.cropped_width as f64);
        assert_abs_diff_eq!(data.scale_y, 256.0 / data.cropped_height as f64);

        let region = data.region();
        assert_abs_diff_eq!(region.x, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(region.width, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn zero_and_tiny_frames_are_errors() {
        let mut scratch = RgbImage::new(1, 1);
        let empty = RgbImage::new(0, 0);
        assert_eq!(
            crop_video_frame(&empty, &Roi::full(), &mut scratch, &CropOptions::default()),
            Err(RoiError::EmptyFrame { width: 0, height: 0 })
        );
        let tiny = gradient(32, 32);
        assert!(matches!(
            crop_video_frame(&tiny, &Roi::full(), &mut scratch, &CropOptions::default()),
            Err(RoiError::FrameTooSmall { .. })
        ));
    }

    #[test]
    fn malformed_roi_is_corrected() {
        let frame = gradient(200, 100);
        let mut scratch = RgbImage::new(1, 1);
        let roi = Roi::new(f64::NAN, -4.0, 9.0, f64::INFINITY);
        let data = crop_video_frame(&frame, &roi, &mut scratch, &CropOptions::default()).expect("crop");
        assert_eq!((data.offset_x, data.offset_y), (0, 0));
        assert_eq!((data.cropped_width, data.cropped_height), (200, 100));
    }
}
