//! Display sizing for decoded images
//!
//! Two independent passes:
//! 1. Fit to the effective width (a degenerate viewport narrower than
//!    `min_width` is replaced by `fallback_width`).
//! 2. Cap the height at `max_height`; this may narrow the width further.
//!
//! Both passes only ever shrink, and both preserve aspect ratio.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::codec::Bitmap;

/// Sizing rules for displayed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingPolicy {
    /// Widths below this are treated as "not laid out yet"
    pub min_width: u32,
    /// Width substituted for a degenerate viewport
    pub fallback_width: u32,
    /// Hard cap on displayed height
    pub max_height: u32,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            min_width: 100,
            fallback_width: 400,
            max_height: 600,
        }
    }
}

impl ScalingPolicy {
    /// Width actually used for the first pass
    pub fn effective_width(&self, available_width: u32) -> u32 {
        if available_width < self.min_width {
            self.fallback_width
        } else {
            available_width
        }
    }

    /// Compute display dimensions without touching pixels
    pub fn target_dimensions(&self, width: u32, height: u32, available_width: u32) -> (u32, u32) {
        let (mut w, mut h) = (width, height);

        let target_width = self.effective_width(available_width);
        if w > target_width {
            h = proportional(h, target_width, w);
            w = target_width;
        }

        if h > self.max_height {
            w = proportional(w, self.max_height, h);
            h = self.max_height;
        }

        (w, h)
    }

    /// Produce the display bitmap for `bitmap` at the given available width
    pub fn scale(&self, bitmap: &Bitmap, available_width: u32) -> Bitmap {
        let (width, height) = bitmap.dimensions();
        let (w, h) = self.target_dimensions(width, height, available_width);
        if (w, h) == (width, height) {
            return bitmap.clone();
        }
        tracing::trace!("Scaling {}x{} -> {}x{}", width, height, w, h);
        imageops::resize(bitmap, w, h, FilterType::Triangle)
    }
}

/// `value * numerator / denominator`, rounded, never below 1
fn proportional(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value.max(1);
    }
    let scaled = (u64::from(value) * u64::from(numerator) + u64::from(denominator) / 2)
        / u64::from(denominator);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}
