//! Single-region detection pipeline.
//!
//! Thresholding, component labeling, boundary clustering, quad fitting and
//! payload decoding, in that order. A [`TagDetector`] owns every buffer these
//! stages reuse from one run to the next.

mod clusters;
mod components;
mod decode;
mod error;
mod gray_model;
mod params;
mod pipeline;
mod preprocess;
mod quad;
mod refine;
mod result;
mod threshold;

pub use clusters::{cluster_key, BoundaryClusterer, BoundaryPoint, ClusterMap};
pub use components::{ComponentForest, ComponentLabeler};
pub use decode::PayloadDecoder;
pub use error::{DetectError, DetectorError};
pub use gray_model::{GrayModel, GrayPlane};
pub use params::{DetectionConfig, QuadThresholdConfig};
pub use pipeline::{build_dictionaries, TagDetector};
pub use preprocess::{apply_quad_sigma, decimate};
pub use quad::{Quad, QuadFitParams, QuadFitter};
pub use refine::refine_edges;
pub use result::{Detection, TagReadout};
pub use threshold::{Label, LabelMap, Thresholder, TILE_SIZE};

pub(crate) use pipeline::check_view;
