//! Embedded built-in families.
//!
//! The source-of-truth lives in `maytags-family/data/*.json`.

#![allow(clippy::unreadable_literal)]

use crate::{BitLocation, TagFamily};
use std::borrow::Cow;

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));

/// Look up an embedded family by name.
///
/// Matching ignores ASCII case and an optional `tag` prefix, so `"36h11"`,
/// `"tag36h11"` and `"Tag36h11"` all resolve to the same family.
pub fn builtin_family(name: &str) -> Option<&'static TagFamily> {
    let wanted = canonical_name(name);
    BUILTIN_FAMILIES
        .iter()
        .copied()
        .find(|f| canonical_name(&f.name) == wanted)
}

/// Names of every embedded family.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_FAMILIES.iter().map(|f| f.name.as_ref())
}

fn canonical_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_prefix("tag") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitRotation;

    /// Smallest Hamming distance between any two codewords, or a codeword and
    /// one of its own quarter turns.
    fn min_rotational_distance(family: &TagFamily) -> u32 {
        let rot = BitRotation::new(family).expect("symmetric layout");
        let turned: Vec<[u64; 4]> = family
            .codes
            .iter()
            .map(|&c| [0, 1, 2, 3].map(|k| rot.rotate_by(c, k)))
            .collect();
        let mut best = u32::MAX;
        for (a, ra) in turned.iter().enumerate() {
            for r in &ra[1..] {
                best = best.min((ra[0] ^ r).count_ones());
            }
            for rb in &turned[a + 1..] {
                for r in ra {
                    best = best.min((r ^ rb[0]).count_ones());
                }
            }
        }
        best
    }

    #[test]
    fn builtin_tables_are_valid() {
        for family in BUILTIN_FAMILIES {
            family.validate().expect("valid builtin family");
        }
        assert_eq!(TAG36H11.bit_count(), 36);
        assert_eq!(TAG36H11.codes.len(), 587);
        assert_eq!(TAG16H5.bit_count(), 16);
        assert_eq!(TAG16H5.codes.len(), 30);
    }

    #[test]
    fn builtin_families_keep_their_minimum_distance() {
        assert_eq!(TAG36H11.min_hamming, 11);
        assert_eq!(TAG16H5.min_hamming, 5);
        for family in BUILTIN_FAMILIES {
            let distance = min_rotational_distance(family);
            assert!(
                distance >= family.min_hamming,
                "{}: distance {distance} below {}",
                family.name,
                family.min_hamming
            );
        }
    }

    #[test]
    fn lookup_accepts_common_spellings() {
        for name in ["36h11", "tag36h11", "Tag36H11", " 36h11 "] {
            let family = builtin_family(name).expect("known family");
            assert_eq!(family.name, "36h11");
        }
        assert!(builtin_family("25h9").is_none());
        assert_eq!(builtin_names().collect::<Vec<_>>(), vec!["16h5", "36h11"]);
    }
}
