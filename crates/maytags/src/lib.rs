//! Parallel fiducial tag detection.
//!
//! This crate provides:
//! - the single-region pipeline in [`detector`]: tile thresholding, union-find
//!   labeling, boundary clustering, quad fitting and payload decoding,
//! - frame partitioning with overlapping margins ([`partition`]) and the merge
//!   of per-partition detections ([`merge`]),
//! - [`PartitionedDetector`], which runs one detector per partition on the
//!   rayon pool,
//! - JSON config files ([`io`]) and tag rendering for synthetic scenes
//!   ([`render`]).
//!
//! ## Quickstart
//!
//! ```no_run
//! use maytags::{detect, DetectionConfig, PartitionConfig, PartitionedDetector};
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("tags.png")?.decode()?.to_luma8();
//! let mut detector =
//!     PartitionedDetector::new(DetectionConfig::default(), PartitionConfig::default())?;
//! let frame = detect::detect_gray(&mut detector, &img, 4)?;
//! for tag in frame.readouts() {
//!     println!("{} at ({:.1}, {:.1})", tag.id, tag.x, tag.y);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `maytags::core`: gray buffers, homographies, rectangles and logging.
//! - `maytags::family`: tag families and the code dictionary.
//! - `maytags::detect` (feature `image`): helpers from `image` buffers.

pub use maytags_core as core;
pub use maytags_family as family;

pub mod detector;
pub mod io;
pub mod merge;
pub mod parallel;
pub mod partition;
pub mod render;

#[cfg(feature = "image")]
pub mod detect;

pub use detector::{
    DetectError, Detection, DetectionConfig, DetectorError, QuadThresholdConfig, TagDetector,
    TagReadout,
};
pub use io::{ConfigIoError, DetectorConfigFile};
pub use merge::{DetectionMerger, FrameReadout};
pub use parallel::{PartitionConfig, PartitionedDetector};
pub use partition::{add_margin, partition_rectangle, PartitionPlanner};
