use super::DetectorError;
use serde::{Deserialize, Serialize};

/// Thresholds gating clusters and quad fits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadThresholdConfig {
    /// Minimum pixel count of both components bordering a cluster, and the
    /// base of the squared merge distance between partitions.
    pub min_cluster_pixels: usize,
    /// Number of error maxima kept as corner candidates.
    pub max_maxima: usize,
    /// Adjacent edges closer than this to parallel are not a corner.
    pub critical_angle_rad: f64,
    /// Upper bound on the mean squared error of each fitted edge.
    pub max_line_mse: f64,
    /// Tiles with less contrast than this are left indeterminate.
    pub min_white_black_diff: u8,
}

impl Default for QuadThresholdConfig {
    fn default() -> Self {
        Self {
            min_cluster_pixels: 5,
            max_maxima: 10,
            critical_angle_rad: 10f64.to_radians(),
            max_line_mse: 10.0,
            min_white_black_diff: 5,
        }
    }
}

/// Configuration of a single-region tag detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Families to decode, tried in order for every quad.
    pub families: Vec<String>,
    /// Quads are searched on an image subsampled by this factor.
    pub quad_decimate: u32,
    /// Gaussian blur (`> 0`) or unsharp mask (`< 0`) applied before thresholding.
    pub quad_sigma: f32,
    /// Re-fit quad edges against the full resolution image.
    pub refine_edges: bool,
    /// Weight of the Laplacian added to sampled bits.
    pub decode_sharpening: f64,
    /// Maximum number of corrected bits, at most 2.
    pub max_hamming: u8,
    pub quad: QuadThresholdConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            families: vec!["36h11".to_string()],
            quad_decimate: 1,
            quad_sigma: 0.0,
            refine_edges: false,
            decode_sharpening: 0.25,
            max_hamming: 2,
            quad: QuadThresholdConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Default configuration decoding a single family.
    pub fn for_family(name: &str) -> Self {
        Self {
            families: vec![name.to_string()],
            ..Self::default()
        }
    }

    /// Reject configurations the detector cannot run with.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let invalid = |name: &'static str, reason: String| {
            Err(DetectorError::InvalidParameter { name, reason })
        };

        if self.families.is_empty() {
            return Err(DetectorError::NoFamilies);
        }
        if self.quad_decimate == 0 {
            return invalid("quad_decimate", "must be at least 1".to_string());
        }
        if !self.quad_sigma.is_finite() {
            return invalid("quad_sigma", format!("{} is not finite", self.quad_sigma));
        }
        if !self.decode_sharpening.is_finite() || self.decode_sharpening < 0.0 {
            return invalid(
                "decode_sharpening",
                format!("{} is not a finite non-negative weight", self.decode_sharpening),
            );
        }
        if self.quad.max_maxima < 4 {
            return invalid(
                "quad.max_maxima",
                format!("{} cannot hold four corners", self.quad.max_maxima),
            );
        }
        let angle = self.quad.critical_angle_rad;
        if !(0.0..std::f64::consts::FRAC_PI_2).contains(&angle) {
            return invalid("quad.critical_angle_rad", format!("{angle} is outside [0, pi/2)"));
        }
        if self.quad.max_line_mse.is_nan() || self.quad.max_line_mse <= 0.0 {
            return invalid(
                "quad.max_line_mse",
                format!("{} must be positive", self.quad.max_line_mse),
            );
        }
        Ok(())
    }
}
