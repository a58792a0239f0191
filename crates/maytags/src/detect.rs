//! Adapters from the `image` crate.

use crate::detector::DetectError;
use crate::merge::FrameReadout;
use crate::parallel::PartitionedDetector;
use maytags_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a [`GrayImageView`].
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Run the partitioned detector on an 8-bit gray image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, img), fields(width = img.width(), height = img.height()))
)]
pub fn detect_gray(
    detector: &mut PartitionedDetector,
    img: &::image::GrayImage,
    workers: usize,
) -> Result<FrameReadout, DetectError> {
    detector.detect(&gray_view(img), workers)
}

/// Run the partitioned detector on a decoded image, which must be `Luma8`.
///
/// Other pixel formats are rejected rather than converted.
pub fn detect_dynamic(
    detector: &mut PartitionedDetector,
    img: &::image::DynamicImage,
    workers: usize,
) -> Result<FrameReadout, DetectError> {
    match img {
        ::image::DynamicImage::ImageLuma8(gray) => detect_gray(detector, gray, workers),
        other => Err(DetectError::UnsupportedPixelFormat {
            format: format!("{:?}", other.color()),
        }),
    }
}
