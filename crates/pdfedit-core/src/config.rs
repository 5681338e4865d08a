//! Editor configuration

use crate::coords::DEFAULT_VERTICAL_OFFSET;
use crate::edit::{DEFAULT_FONT_SIZE, DEFAULT_IMAGE_SIZE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM: f32 = 1.5;
pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.1;
pub const DOWNLOAD_FILE_NAME: &str = "edited.pdf";

/// Tunables for an [`Editor`](crate::Editor)
///
/// Every field has a default, so a partial JSON object such as
/// `{"vertical_offset": 0}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Added to the distance from the canvas bottom when mapping clicks
    pub vertical_offset: f64,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub default_zoom: f32,
    pub font_size: f64,
    /// Width and height of placed images, in points
    pub image_size: (f64, f64),
    pub download_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            vertical_offset: DEFAULT_VERTICAL_OFFSET,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_step: ZOOM_STEP,
            default_zoom: DEFAULT_ZOOM,
            font_size: DEFAULT_FONT_SIZE,
            image_size: DEFAULT_IMAGE_SIZE,
            download_name: DOWNLOAD_FILE_NAME.to_string(),
        }
    }
}

impl EditorConfig {
    /// Clamp `scale` to the zoom bounds and snap it to the zoom step
    pub fn clamp_zoom(&self, scale: f32) -> f32 {
        let (lo, hi) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        if !scale.is_finite() {
            return self.default_zoom.clamp(lo, hi);
        }

        let clamped = scale.clamp(lo, hi);
        if self.zoom_step > 0.0 {
            // Snap, then clamp again in case rounding stepped over a bound
            ((clamped / self.zoom_step).round() * self.zoom_step).clamp(lo, hi)
        } else {
            clamped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.vertical_offset, 225.0);
        assert_eq!(config.default_zoom, 1.5);
        assert_eq!(config.image_size, (100.0, 100.0));
        assert_eq!(config.download_name, "edited.pdf");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"vertical_offset": 0, "font_size": 18}"#).unwrap();
        assert_eq!(config.vertical_offset, 0.0);
        assert_eq!(config.font_size, 18.0);
        assert_eq!(config.max_zoom, 2.0);
    }

    #[test]
    fn test_clamp_zoom_bounds() {
        let config = EditorConfig::default();
        assert_eq!(config.clamp_zoom(0.1), 0.5);
        assert_eq!(config.clamp_zoom(7.0), 2.0);
        assert_eq!(config.clamp_zoom(f32::NAN), 1.5);
    }

    #[test]
    fn test_clamp_zoom_snaps_to_step() {
        let config = EditorConfig::default();
        assert!((config.clamp_zoom(1.26) - 1.3).abs() < 1e-5);
        assert!((config.clamp_zoom(1.5) - 1.5).abs() < 1e-5);
    }
}
