//! Grouping of black/white transitions by the pair of components they separate.

use super::components::ComponentForest;
use super::threshold::LabelMap;
use nalgebra::{Point2, Vector2};
use std::collections::BTreeMap;

/// One black/white transition between two neighboring pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryPoint {
    /// Midpoint of the two pixels, in pixel index coordinates.
    pub position: Point2<f64>,
    /// Pixel offset scaled by the label difference, pointing from black to white.
    pub gradient: Vector2<f64>,
    /// Polar angle around the cluster center, set by the quad fitter.
    pub slope: f64,
}

/// Boundary points keyed by the component pair, see [`cluster_key`].
pub type ClusterMap = BTreeMap<u64, Vec<BoundaryPoint>>;

/// Order-independent key of two representatives: smaller id in the high word.
#[inline]
pub fn cluster_key(a: u32, b: u32) -> u64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    ((lo as u64) << 32) | hi as u64
}

const OFFSETS: [(isize, usize); 4] = [(1, 0), (0, 1), (-1, 1), (1, 1)];

#[derive(Clone, Debug, Default)]
pub struct BoundaryClusterer {
    clusters: ClusterMap,
}

impl BoundaryClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clusters(&self) -> &ClusterMap {
        &self.clusters
    }

    /// Collect transitions between components of at least `min_component_size`
    /// pixels. The last row and the first and last columns only act as neighbors.
    pub fn cluster(
        &mut self,
        labels: &LabelMap,
        forest: &mut ComponentForest,
        min_component_size: usize,
    ) -> &mut ClusterMap {
        self.clusters.clear();
        let (w, h) = (labels.width(), labels.height());
        if w < 3 || h < 2 {
            return &mut self.clusters;
        }
        let id = |x: usize, y: usize| (y * w + x) as u32;

        for y in 0..h - 1 {
            for x in 1..w - 1 {
                let v0 = labels.get(x, y);
                if !v0.is_determinate() {
                    continue;
                }
                let rep0 = forest.find(id(x, y));
                if (forest.size(rep0) as usize) < min_component_size {
                    continue;
                }
                for (dx, dy) in OFFSETS {
                    let nx = x.wrapping_add_signed(dx);
                    let ny = y + dy;
                    let v1 = labels.get(nx, ny);
                    if !v0.is_complement_of(v1) {
                        continue;
                    }
                    let rep1 = forest.find(id(nx, ny));
                    if (forest.size(rep1) as usize) < min_component_size {
                        continue;
                    }
                    let diff = v1.value() as f64 - v0.value() as f64;
                    self.clusters
                        .entry(cluster_key(rep0, rep1))
                        .or_default()
                        .push(BoundaryPoint {
                            position: Point2::new(
                                x as f64 + dx as f64 / 2.0,
                                y as f64 + dy as f64 / 2.0,
                            ),
                            gradient: Vector2::new(dx as f64 * diff, dy as f64 * diff),
                            slope: 0.0,
                        });
                }
            }
        }
        log::trace!("{} boundary clusters", self.clusters.len());
        &mut self.clusters
    }
}
