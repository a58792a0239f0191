use maytags_core::{Homography, CANONICAL_CORNERS};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A decoded tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Name of the family the code word belongs to.
    pub family: String,
    pub id: u32,
    /// Bits corrected by the dictionary lookup.
    pub hamming: u8,
    /// Quarter turns between the fitted quad and the tag's canonical orientation.
    pub rotation: u8,
    /// Smaller of the mean white and mean black bit contrast.
    pub decision_margin: f64,
    pub center: Point2<f64>,
    /// Image corners of the canonical square corners, in tag orientation.
    pub corners: [Point2<f64>; 4],
    /// Canonical square `[-1, 1]^2` to image, in tag orientation.
    pub homography: Homography,
}

/// The per-frame summary of one tag handed to downstream consumers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagReadout {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    /// Angle of the tag's `+x` axis in the image, radians.
    pub theta: f64,
}

impl Detection {
    /// Build the geometric fields from a homography already in tag orientation.
    pub(crate) fn from_homography(
        family: &str,
        id: u32,
        hamming: u8,
        rotation: u8,
        decision_margin: f64,
        homography: Homography,
    ) -> Self {
        Self {
            family: family.to_string(),
            id,
            hamming,
            rotation,
            decision_margin,
            center: homography.apply(Point2::origin()),
            corners: CANONICAL_CORNERS.map(|c| homography.apply(c)),
            homography,
        }
    }

    /// Same detection expressed in a frame where the region origin is `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            center: Point2::new(self.center.x + dx, self.center.y + dy),
            corners: self.corners.map(|p| Point2::new(p.x + dx, p.y + dy)),
            homography: self.homography.translated(dx, dy),
            ..self.clone()
        }
    }

    /// Orientation of the tag: from the middle of its left edge to the middle
    /// of its right edge.
    pub fn theta(&self) -> f64 {
        let left = nalgebra::center(&self.corners[0], &self.corners[3]);
        let right = nalgebra::center(&self.corners[1], &self.corners[2]);
        let d = right - left;
        d.y.atan2(d.x)
    }

    pub fn readout(&self) -> TagReadout {
        TagReadout {
            id: self.id,
            x: self.center.x,
            y: self.center.y,
            theta: self.theta(),
        }
    }
}
