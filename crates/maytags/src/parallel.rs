//! Frame-level detection: one [`TagDetector`] per partition, run in parallel.

use crate::detector::{
    build_dictionaries, check_view, DetectError, Detection, DetectionConfig, DetectorError,
    TagDetector,
};
use crate::merge::{DetectionMerger, FrameReadout};
use crate::partition::PartitionPlanner;
use maytags_core::{GrayImageView, PixelRect};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How a frame is split between workers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Overlap added around every partition, pixels.
    pub margin: usize,
    /// Number of detectors kept; requests for more workers are clamped.
    pub max_workers: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            margin: 75,
            max_workers: rayon::current_num_threads(),
        }
    }
}

/// Parallel detector over a whole frame.
///
/// Dictionaries are built once and shared by every worker; each worker keeps
/// its own buffers between frames.
#[derive(Debug)]
pub struct PartitionedDetector {
    workers: Vec<TagDetector>,
    planner: PartitionPlanner,
    merger: DetectionMerger,
}

impl PartitionedDetector {
    pub fn new(config: DetectionConfig, partition: PartitionConfig) -> Result<Self, DetectorError> {
        if partition.max_workers == 0 {
            return Err(DetectorError::NoWorkers);
        }
        let dictionaries = build_dictionaries(&config)?;
        let merger = DetectionMerger::from_min_cluster_pixels(config.quad.min_cluster_pixels);
        let workers = (0..partition.max_workers)
            .map(|_| TagDetector::with_dictionaries(config.clone(), dictionaries.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let planner = PartitionPlanner::new(0, 0, partition.margin, partition.max_workers)?;
        log::debug!(
            "partitioned detector: {} workers, margin {}",
            workers.len(),
            partition.margin
        );
        Ok(Self {
            workers,
            planner,
            merger,
        })
    }

    #[inline]
    pub fn max_workers(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn planner(&self) -> &PartitionPlanner {
        &self.planner
    }

    #[inline]
    pub fn config(&self) -> &DetectionConfig {
        // Every worker shares the same configuration.
        self.workers[0].config()
    }

    /// Detect tags in `image` using up to `workers` partitions.
    ///
    /// A partition that fails is logged and contributes nothing; only an
    /// image that breaks the input contract is an error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(
        &mut self,
        image: &GrayImageView<'_>,
        workers: usize,
    ) -> Result<FrameReadout, DetectError> {
        check_view(image)?;
        self.planner.resize(image.width, image.height);
        let partitions = self.planner.partitions(workers);

        let results: Vec<(Vec<Detection>, usize)> = self.workers[..partitions.len()]
            .par_iter_mut()
            .zip(partitions.par_iter())
            .map(|(detector, &rect)| detect_partition(detector, image, rect))
            .collect();

        let quad_count = results.iter().map(|(_, quads)| quads).sum();
        let detections = self.merger.merge(results.into_iter().map(|(d, _)| d));
        log::debug!(
            "frame {}x{}: {} partitions, {} quads, {} tags",
            image.width,
            image.height,
            partitions.len(),
            quad_count,
            detections.len()
        );
        Ok(FrameReadout {
            detections,
            quad_count,
        })
    }
}

/// Run one worker on its partition; detections come back in frame coordinates.
fn detect_partition(
    detector: &mut TagDetector,
    image: &GrayImageView<'_>,
    rect: PixelRect,
) -> (Vec<Detection>, usize) {
    if rect.is_empty() {
        return (Vec::new(), 0);
    }
    let region = image.crop(rect);
    match detector.detect(&region.view()) {
        Ok(found) => {
            let (dx, dy) = (rect.x as f64, rect.y as f64);
            let found = found.iter().map(|d| d.translated(dx, dy)).collect();
            (found, detector.quads().len())
        }
        Err(err) => {
            log::warn!("partition {rect:?} failed: {err}");
            (Vec::new(), 0)
        }
    }
}
