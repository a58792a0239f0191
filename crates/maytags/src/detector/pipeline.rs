use super::clusters::BoundaryClusterer;
use super::components::ComponentLabeler;
use super::decode::PayloadDecoder;
use super::preprocess::{apply_quad_sigma, decimate, kernel_size};
use super::quad::{Quad, QuadFitParams, QuadFitter};
use super::refine::refine_edges;
use super::threshold::Thresholder;
use super::{DetectError, Detection, DetectionConfig, DetectorError};
use maytags_core::{GrayImage, GrayImageView};
use maytags_family::{CodeDictionary, TagFamily};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Resolve the configured families and build one dictionary each.
pub fn build_dictionaries(
    config: &DetectionConfig,
) -> Result<Vec<Arc<CodeDictionary>>, DetectorError> {
    config.validate()?;
    config
        .families
        .iter()
        .map(|name| {
            let family = Arc::new(TagFamily::from_name(name)?);
            Ok(Arc::new(CodeDictionary::new(family, config.max_hamming)?))
        })
        .collect()
}

/// Check a view against the 8-bit single channel contract.
pub(crate) fn check_view(image: &GrayImageView<'_>) -> Result<(), DetectError> {
    if image.width == 0 || image.height == 0 {
        return Err(DetectError::InvalidGrayDimensions {
            width: image.width,
            height: image.height,
        });
    }
    let expected = image.width * image.height;
    if image.data.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: image.data.len(),
        });
    }
    Ok(())
}

/// Single-region tag detector.
///
/// Owns all per-run buffers, so it is reused across frames but never shared
/// between two regions in flight. Dictionaries are shared read-only.
#[derive(Clone, Debug)]
pub struct TagDetector {
    config: DetectionConfig,
    fit_params: QuadFitParams,
    decoders: Vec<PayloadDecoder>,
    thresholder: Thresholder,
    labeler: ComponentLabeler,
    clusterer: BoundaryClusterer,
    fitter: QuadFitter,
    quads: Vec<Quad>,
}

impl TagDetector {
    /// Create a detector, building dictionaries for the configured families.
    pub fn new(config: DetectionConfig) -> Result<Self, DetectorError> {
        let dictionaries = build_dictionaries(&config)?;
        Self::with_dictionaries(config, dictionaries)
    }

    /// Create a detector over prebuilt dictionaries, tried in order.
    ///
    /// `config.families` is not consulted beyond validation.
    pub fn with_dictionaries(
        config: DetectionConfig,
        dictionaries: Vec<Arc<CodeDictionary>>,
    ) -> Result<Self, DetectorError> {
        config.validate()?;
        if dictionaries.is_empty() {
            return Err(DetectorError::NoFamilies);
        }

        let families = dictionaries.iter().map(|d| d.family());
        let min_width = families
            .clone()
            .map(|f| f.width_at_border as usize)
            .min()
            .unwrap_or(0);
        let reversed_border = families.clone().any(|f| f.reversed_border);
        let normal_border = families.clone().any(|f| !f.reversed_border);
        let min_tag_width = (min_width / config.quad_decimate as usize).max(3);

        let fit_params = QuadFitParams::new(&config.quad, min_tag_width, normal_border, reversed_border);
        let decoders = dictionaries
            .into_iter()
            .map(|d| PayloadDecoder::new(d, config.decode_sharpening))
            .collect();

        Ok(Self {
            config,
            fit_params,
            decoders,
            thresholder: Thresholder::new(),
            labeler: ComponentLabeler::new(),
            clusterer: BoundaryClusterer::new(),
            fitter: QuadFitter::new(),
            quads: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Dictionaries in decoding order.
    pub fn dictionaries(&self) -> impl Iterator<Item = &Arc<CodeDictionary>> {
        self.decoders.iter().map(|d| d.dictionary())
    }

    /// Candidate quads of the last run, in image coordinates.
    #[inline]
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Detect tags in `image`.
    ///
    /// Each `(family, id)` is reported once: the decode with fewer corrected
    /// bits wins, then the one with the larger decision margin. Results are
    /// ordered by family then id.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&mut self, image: &GrayImageView<'_>) -> Result<Vec<Detection>, DetectError> {
        check_view(image)?;
        self.find_quads(image);

        let mut best: BTreeMap<(String, u32), Detection> = BTreeMap::new();
        for quad in &self.quads {
            let Some(d) = self.decoders.iter_mut().find_map(|dec| dec.decode(image, quad)) else {
                continue;
            };
            match best.entry((d.family.clone(), d.id)) {
                Entry::Vacant(slot) => {
                    slot.insert(d);
                }
                Entry::Occupied(mut slot) => {
                    let kept = slot.get();
                    if d.hamming < kept.hamming
                        || (d.hamming == kept.hamming && d.decision_margin > kept.decision_margin)
                    {
                        slot.insert(d);
                    }
                }
            }
        }

        log::debug!(
            "{}x{}: {} quads, {} tags",
            image.width,
            image.height,
            self.quads.len(),
            best.len()
        );
        Ok(best.into_values().collect())
    }

    fn quad_image(&self, image: &GrayImageView<'_>) -> Option<GrayImage> {
        let decimation = self.config.quad_decimate;
        let sigma = self.config.quad_sigma;
        let filter = sigma != 0.0 && kernel_size(sigma) > 1;
        if decimation <= 1 && !filter {
            return None;
        }
        let mut prepared = if decimation > 1 {
            decimate(image, decimation)
        } else {
            GrayImage {
                width: image.width,
                height: image.height,
                data: image.data.to_vec(),
            }
        };
        if filter {
            apply_quad_sigma(&mut prepared, sigma);
        }
        Some(prepared)
    }

    fn find_quads(&mut self, image: &GrayImageView<'_>) {
        let prepared = self.quad_image(image);
        let view = prepared.as_ref().map_or(*image, |p| p.view());

        let labels = self
            .thresholder
            .threshold(&view, self.config.quad.min_white_black_diff);
        let forest = self.labeler.label(labels);
        let clusters = self
            .clusterer
            .cluster(labels, forest, self.config.quad.min_cluster_pixels);
        let fitted = self.fitter.fit_quads(&view, clusters, &self.fit_params);

        let decimation = self.config.quad_decimate;
        let search_range = decimation as f64 + 1.0;
        self.quads.clear();
        for quad in fitted {
            let quad = if decimation > 1 {
                match quad.undecimated(decimation) {
                    Some(q) => q,
                    None => continue,
                }
            } else {
                quad.clone()
            };
            let quad = if self.config.refine_edges {
                refine_edges(image, &quad, search_range).unwrap_or(quad)
            } else {
                quad
            };
            self.quads.push(quad);
        }
    }
}
