//! Merging per-partition detections into one frame readout.

use crate::detector::{Detection, TagReadout};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Drops detections repeated in the overlap between partitions.
///
/// A detection is kept unless an already kept detection of the same family
/// and id has its center within `sqrt(min_distance_sq)` pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionMerger {
    min_distance_sq: f64,
}

impl DetectionMerger {
    pub fn new(min_distance_sq: f64) -> Self {
        Self { min_distance_sq }
    }

    /// Threshold derived from the minimum cluster size, squared.
    pub fn from_min_cluster_pixels(min_cluster_pixels: usize) -> Self {
        let d = min_cluster_pixels as f64;
        Self::new(d * d)
    }

    #[inline]
    pub fn min_distance_sq(&self) -> f64 {
        self.min_distance_sq
    }

    /// Merge partition results in partition order; the first writer wins.
    ///
    /// Detections must already be in frame coordinates.
    pub fn merge<I>(&self, partitions: I) -> Vec<Detection>
    where
        I: IntoIterator,
        I::Item: IntoIterator<Item = Detection>,
    {
        let mut kept: Vec<Detection> = Vec::new();
        let mut by_tag: HashMap<(String, u32), Vec<usize>> = HashMap::new();
        for d in partitions.into_iter().flatten() {
            let seen = by_tag.entry((d.family.clone(), d.id)).or_default();
            let duplicate = seen
                .iter()
                .any(|&i| (kept[i].center - d.center).norm_squared() < self.min_distance_sq);
            if duplicate {
                log::trace!("dropping duplicate {} id {} at {:?}", d.family, d.id, d.center);
                continue;
            }
            seen.push(kept.len());
            kept.push(d);
        }
        kept
    }
}

/// Everything detected in one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReadout {
    pub detections: Vec<Detection>,
    /// Candidate quads over all partitions, before decoding.
    pub quad_count: usize,
}

impl FrameReadout {
    pub fn readouts(&self) -> Vec<TagReadout> {
        self.detections.iter().map(Detection::readout).collect()
    }
}
