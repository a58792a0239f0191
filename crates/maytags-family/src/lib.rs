//! Tag families and code word decoding.
//!
//! This crate focuses on:
//! - embedded family tables (compiled into the binary from `data/*.json`),
//! - custom families loaded from the same JSON format at runtime,
//! - the quarter-turn bit rotation over a family's lattice,
//! - the precomputed [`CodeDictionary`] resolving observed code words with up
//!   to two flipped bits.
//!
//! It does **not** sample images. The detector in the `maytags` crate turns
//! quads into code words and hands them to [`CodeDictionary::decode`].

pub mod builtins;
mod dictionary;
mod error;
mod family;
mod rotation;

pub use dictionary::{CodeDictionary, DictionaryMatch, MAX_SUPPORTED_HAMMING};
pub use error::FamilyError;
pub use family::{BitLocation, TagFamily};
pub use rotation::BitRotation;
