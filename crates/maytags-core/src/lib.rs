//! Core types and utilities for fiducial tag detection.
//!
//! This crate is intentionally small and purely geometric: 8-bit grayscale
//! buffers, the square-to-image `Homography`, axis-aligned pixel rectangles
//! and a minimal logger. It does *not* know about tag families or decoding.

mod homography;
mod image;
mod logger;
mod rect;

pub use homography::{homography_from_4pt, Homography, CANONICAL_CORNERS};
pub use image::{sample_bilinear, GrayImage, GrayImageView};
pub use rect::PixelRect;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
