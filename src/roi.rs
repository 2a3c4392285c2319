//! Region-of-interest cropping.
//!
//! A [`Roi`] is stored as `(x, y, w, h)`: left offset, top offset, width and
//! height in pixels. Cropping follows half-open slicing semantics: rows
//! `[y, y + h)` and columns `[x, x + w)`. A rectangle that reaches past the
//! image is truncated to the part that lies inside it, never rejected.

use image::{GenericImageView, ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RoiError, RoiResult};

/// Owned image buffer with the same pixel type as the source view
pub type Crop<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// ROI covering a whole `width` x `height` image
    pub const fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.h == 0 {
            None
        } else {
            Some(self.w as f64 / self.h as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Optional validation layer: rejects rectangles without pixels.
    ///
    /// Cropping itself never calls this; an empty ROI simply yields an empty
    /// image there.
    pub fn validate(&self) -> RoiResult<()> {
        if self.is_empty() {
            return Err(RoiError::Empty {
                x: self.x,
                y: self.y,
                w: self.w,
                h: self.h,
            });
        }
        Ok(())
    }

    /// Grow the shorter side so that `w / h` matches `target_ratio`.
    ///
    /// The box is only ever expanded and the expanded side is re-centered on
    /// the original box. All arithmetic truncates toward zero. The shifted
    /// origin is clamped to 0, but the far edge is left alone and may reach
    /// past the image; cropping truncates it there. That asymmetry is kept on
    /// purpose so stored datasets crop identically, though it is most likely
    /// an oversight in the original tooling.
    pub fn fit_aspect_ratio(&self, target_ratio: f64) -> RoiResult<Roi> {
        if !target_ratio.is_finite() || target_ratio <= 0.0 {
            return Err(RoiError::InvalidAspectRatio(target_ratio));
        }
        let current_ratio = self.aspect_ratio().ok_or(RoiError::ZeroHeight {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        })?;

        let (x, y, w, h) = (self.x as f64, self.y as f64, self.w as f64, self.h as f64);

        if current_ratio > target_ratio {
            // Too wide: grow the height
            let new_h = (w / target_ratio) as u32;
            let new_y = (y - (new_h as f64 - h) / 2.0).trunc().max(0.0) as u32;
            Ok(Roi::new(self.x, new_y, self.w, new_h))
        } else {
            // Too tall, or already matching: grow the width
            let new_w = (target_ratio * h) as u32;
            let new_x = (x - (new_w as f64 - w) / 2.0).trunc().max(0.0) as u32;
            Ok(Roi::new(new_x, self.y, new_w, self.h))
        }
    }

    /// The part of this ROI that lies inside a `width` x `height` image
    pub fn clamp_to(&self, width: u32, height: u32) -> Roi {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let w = self.w.min(width - x);
        let h = self.h.min(height - y);
        Roi::new(x, y, w, h)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.w, self.h)
    }
}

impl From<[u32; 4]> for Roi {
    fn from(v: [u32; 4]) -> Self {
        Roi::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Roi> for [u32; 4] {
    fn from(roi: Roi) -> Self {
        [roi.x, roi.y, roi.w, roi.h]
    }
}

impl From<(u32, u32, u32, u32)> for Roi {
    fn from((x, y, w, h): (u32, u32, u32, u32)) -> Self {
        Roi::new(x, y, w, h)
    }
}

impl From<Roi> for (u32, u32, u32, u32) {
    fn from(roi: Roi) -> Self {
        (roi.x, roi.y, roi.w, roi.h)
    }
}

/// Extract the pixels inside `roi`.
///
/// The result has shape `h` x `w` whenever the image is large enough; any
/// part of the rectangle outside the image is silently dropped, and an origin
/// beyond the image yields an empty buffer.
pub fn get_roi<I>(image: &I, roi: Roi) -> Crop<I::Pixel>
where
    I: GenericImageView,
{
    let (width, height) = image.dimensions();
    let visible = roi.clamp_to(width, height);

    ImageBuffer::from_fn(visible.w, visible.h, |cx, cy| {
        image.get_pixel(visible.x + cx, visible.y + cy)
    })
}

/// Extract the pixels inside `roi` after fitting it to `target_ratio`.
///
/// See [`Roi::fit_aspect_ratio`] for how the rectangle is adjusted.
pub fn get_roi_with_aspect_ratio<I>(
    image: &I,
    roi: Roi,
    target_ratio: f64,
) -> RoiResult<Crop<I::Pixel>>
where
    I: GenericImageView,
{
    let adjusted = roi.fit_aspect_ratio(target_ratio)?;
    Ok(get_roi(image, adjusted))
}
