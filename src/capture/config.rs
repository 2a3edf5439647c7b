//! Capture loop configuration

use std::time::Duration;

/// Capture loop options
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Soft frame rate cap
    pub target_fps: f64,

    /// Linear shrink factor applied before face detection
    pub downscale: u32,

    /// JPEG quality for published frames (1-100)
    pub jpeg_quality: u8,

    /// Consecutive acquisition failures before the camera is considered lost
    pub max_consecutive_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            downscale: 4,
            jpeg_quality: 85,
            max_consecutive_failures: 3,
        }
    }
}

impl CaptureConfig {
    /// Set the frame rate cap (clamped to 0.1-240)
    pub fn target_fps(mut self, fps: f64) -> Self {
        self.target_fps = if fps.is_finite() {
            fps.clamp(0.1, 240.0)
        } else {
            CaptureConfig::default().target_fps
        };
        self
    }

    /// Set the detection downscale factor (at least 1)
    pub fn downscale(mut self, factor: u32) -> Self {
        self.downscale = factor.max(1);
        self
    }

    /// Set JPEG quality (clamped to 1-100)
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the consecutive failure limit (at least 1)
    pub fn max_consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = limit.max(1);
        self
    }

    /// Minimum time between the start of two ticks
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();

        assert_eq!(config.target_fps, 30.0);
        assert_eq!(config.downscale, 4);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.max_consecutive_failures, 3);
    }

    #[test]
    fn test_frame_interval() {
        let config = CaptureConfig::default().target_fps(20.0);

        assert_eq!(config.frame_interval().as_millis(), 50);
    }

    #[test]
    fn test_builder_clamps() {
        let config = CaptureConfig::default()
            .target_fps(f64::NAN)
            .downscale(0)
            .jpeg_quality(0)
            .max_consecutive_failures(0);

        assert_eq!(config.target_fps, 30.0);
        assert_eq!(config.downscale, 1);
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.max_consecutive_failures, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CaptureConfig::default()
            .target_fps(15.0)
            .downscale(2)
            .jpeg_quality(70)
            .max_consecutive_failures(5);

        assert_eq!(config.target_fps, 15.0);
        assert_eq!(config.downscale, 2);
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.max_consecutive_failures, 5);
    }
}
