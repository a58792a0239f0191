//! Error-tolerant code word lookup.

use crate::{BitRotation, FamilyError, TagFamily};
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Largest Hamming distance the dictionary can be built for.
pub const MAX_SUPPORTED_HAMMING: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CodeEntry {
    code: u64,
    id: u16,
    hamming: u8,
}

/// A dictionary hit for an observed code word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DictionaryMatch {
    /// Tag id, the index of the codeword in the family.
    pub id: u32,
    /// Number of flipped bits between the observation and the codeword.
    pub hamming: u8,
    /// Quarter turns `0..=3` such that `observed == rotate_by(codeword, rotation)`,
    /// up to `hamming` flipped bits.
    pub rotation: u8,
    /// The family codeword.
    pub code: u64,
}

/// Precomputed map from exact and perturbed codewords to tag identity.
///
/// Built once per family; lookups never mutate it, so a single instance can be
/// shared across threads behind an `Arc`.
#[derive(Clone, Debug)]
pub struct CodeDictionary {
    family: Arc<TagFamily>,
    rotation: BitRotation,
    max_hamming: u8,
    entries: HashMap<u64, CodeEntry>,
}

impl CodeDictionary {
    /// Build the dictionary for `family`, accepting up to `max_hamming` flipped bits.
    ///
    /// Perturbed words reachable from two codewords keep the entry inserted
    /// last, in codeword order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(family), fields(family = %family.name))
    )]
    pub fn new(family: Arc<TagFamily>, max_hamming: u8) -> Result<Self, FamilyError> {
        if max_hamming > MAX_SUPPORTED_HAMMING {
            return Err(FamilyError::UnsupportedHamming { max_hamming });
        }
        family.validate()?;
        let rotation = BitRotation::new(&family)?;

        if 2 * max_hamming as u32 >= family.min_hamming {
            log::warn!(
                "family {} has minimum distance {}: correcting {} bits may decode ambiguously",
                family.name,
                family.min_hamming,
                max_hamming
            );
        }

        let bits = family.bit_count();
        let per_code = 1
            + if max_hamming >= 1 { bits } else { 0 }
            + if max_hamming >= 2 { bits * (bits - 1) / 2 } else { 0 };
        let mut entries = HashMap::with_capacity(family.codes.len() * per_code);

        for (id, &code) in family.codes.iter().enumerate() {
            let id = id as u16;
            entries.insert(
                code,
                CodeEntry {
                    code,
                    id,
                    hamming: 0,
                },
            );
            if max_hamming == 0 {
                continue;
            }
            for i in 0..bits {
                let flipped = code ^ (1u64 << i);
                entries.insert(
                    flipped,
                    CodeEntry {
                        code,
                        id,
                        hamming: 1,
                    },
                );
                if max_hamming < 2 {
                    continue;
                }
                for j in 0..i {
                    entries.insert(
                        flipped ^ (1u64 << j),
                        CodeEntry {
                            code,
                            id,
                            hamming: 2,
                        },
                    );
                }
            }
        }

        log::debug!(
            "built dictionary for {}: {} codes, {} entries (max hamming {})",
            family.name,
            family.codes.len(),
            entries.len(),
            max_hamming
        );

        Ok(Self {
            family,
            rotation,
            max_hamming,
            entries,
        })
    }

    #[inline]
    pub fn family(&self) -> &Arc<TagFamily> {
        &self.family
    }

    #[inline]
    pub fn rotation(&self) -> &BitRotation {
        &self.rotation
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Number of distinct words the dictionary resolves.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `word`, then its successive quarter turns; the first hit wins.
    pub fn decode(&self, word: u64) -> Option<DictionaryMatch> {
        let mut rotated = word;
        for turns in 0..4u8 {
            if let Some(entry) = self.entries.get(&rotated) {
                // `rotated == rotate^turns(word)`, so the observation is the
                // codeword turned by the complementary amount.
                return Some(DictionaryMatch {
                    id: entry.id as u32,
                    hamming: entry.hamming,
                    rotation: (4 - turns) & 3,
                    code: entry.code,
                });
            }
            rotated = self.rotation.rotate(rotated);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtins, BitLocation};
    use std::borrow::Cow;

    fn dictionary(name: &str, max_hamming: u8) -> CodeDictionary {
        let family = Arc::new(TagFamily::from_name(name).expect("builtin"));
        CodeDictionary::new(family, max_hamming).expect("dictionary")
    }

    #[test]
    fn exact_codewords_decode_with_zero_hamming() {
        let dict = dictionary("36h11", 2);
        for (id, &code) in builtins::TAG36H11.codes.iter().enumerate() {
            let m = dict.decode(code).expect("hit");
            assert_eq!(m.id as usize, id);
            assert_eq!(m.hamming, 0);
            assert_eq!(m.rotation, 0);
            assert_eq!(m.code, code);
        }
    }

    #[test]
    fn rotated_codewords_report_rotation() {
        let dict = dictionary("36h11", 2);
        for (id, &code) in builtins::TAG36H11.codes.iter().enumerate().step_by(7) {
            for k in 0..4u8 {
                let observed = dict.rotation().rotate_by(code, k);
                let m = dict.decode(observed).expect("hit");
                assert_eq!(m.id as usize, id, "rotation {k}");
                assert_eq!(m.rotation, k);
                assert_eq!(m.hamming, 0);
            }
        }
    }

    #[test]
    fn flipped_bits_are_corrected_up_to_limit() {
        let dict = dictionary("16h5", 2);
        let code = builtins::TAG16H5.codes[11];
        let one = code ^ (1 << 3);
        let two = one ^ (1 << 14);
        let three = two ^ (1 << 8);

        assert_eq!(dict.decode(one).map(|m| (m.id, m.hamming)), Some((11, 1)));
        assert_eq!(dict.decode(two).map(|m| (m.id, m.hamming)), Some((11, 2)));
        assert!(dict
            .decode(three)
            .map_or(true, |m| !(m.id == 11 && m.rotation == 0)));

        let strict = dictionary("16h5", 0);
        assert!(strict.decode(one).is_none());
        assert_eq!(strict.len(), builtins::TAG16H5.codes.len());
    }

    /// Bit cells of the published AprilTag tables, most significant bit first.
    #[rustfmt::skip]
    const PUBLISHED_36H11_CELLS: [(i32, i32); 36] = [
        (1, 1), (2, 1), (3, 1), (4, 1), (5, 1), (2, 2), (3, 2), (4, 2), (3, 3),
        (6, 1), (6, 2), (6, 3), (6, 4), (6, 5), (5, 2), (5, 3), (5, 4), (4, 3),
        (6, 6), (5, 6), (4, 6), (3, 6), (2, 6), (5, 5), (4, 5), (3, 5), (4, 4),
        (1, 6), (1, 5), (1, 4), (1, 3), (1, 2), (2, 5), (2, 4), (2, 3), (3, 4),
    ];
    #[rustfmt::skip]
    const PUBLISHED_16H5_CELLS: [(i32, i32); 16] = [
        (1, 1), (2, 1), (3, 1), (2, 2), (4, 1), (4, 2), (4, 3), (3, 2),
        (4, 4), (3, 4), (2, 4), (3, 3), (1, 4), (1, 3), (1, 2), (2, 3),
    ];

    /// Lay a published code word onto `family`'s lattice, turned clockwise by
    /// `quarter_turns`.
    fn observed_word(
        family: &TagFamily,
        cells: &[(i32, i32)],
        published: u64,
        quarter_turns: u8,
    ) -> u64 {
        let n = cells.len();
        let w = family.width_at_border as i32;
        let bits = family.bit_count();
        let mut word = 0u64;
        for (i, &(x, y)) in cells.iter().enumerate() {
            if (published >> (n - 1 - i)) & 1 == 0 {
                continue;
            }
            let (mut x, mut y) = (x, y);
            for _ in 0..quarter_turns {
                (x, y) = (w - 1 - y, x);
            }
            let j = family
                .bit_locations
                .iter()
                .position(|l| *l == BitLocation::new(x, y))
                .expect("cell on the lattice");
            word |= 1 << (bits - 1 - j);
        }
        word
    }

    fn assert_known_answers(name: &str, cells: &[(i32, i32)], known: &[(u32, u64)]) {
        let dict = dictionary(name, 2);
        let family = Arc::clone(dict.family());
        for &(id, published) in known {
            assert_eq!(
                family.codes[id as usize],
                observed_word(&family, cells, published, 0),
                "{name} id {id} table entry"
            );
            for k in 0..4u8 {
                let observed = observed_word(&family, cells, published, k);
                let m = dict.decode(observed).expect("exact hit");
                assert_eq!((m.id, m.hamming, m.rotation), (id, 0, k), "{name} id {id}");

                let one = observed ^ (1 << 5);
                let m = dict.decode(one).expect("one flip");
                assert_eq!((m.id, m.hamming, m.rotation), (id, 1, k), "{name} id {id}");

                let two = one ^ (1 << (cells.len() - 2));
                let m = dict.decode(two).expect("two flips");
                assert_eq!((m.id, m.hamming, m.rotation), (id, 2, k), "{name} id {id}");
            }
        }
    }

    #[test]
    fn published_36h11_words_decode_in_every_orientation() {
        assert_known_answers(
            "36h11",
            &PUBLISHED_36H11_CELLS,
            &[
                (0, 0xd7e00984b),
                (1, 0xdda664ca7),
                (2, 0xdc4a1c821),
                (15, 0x51801db96),
                (28, 0xd1b92fc76),
                (29, 0xd0dd509d2),
            ],
        );
    }

    #[test]
    fn published_16h5_words_decode_in_every_orientation() {
        assert_known_answers(
            "16h5",
            &PUBLISHED_16H5_CELLS,
            &[(0, 0x27c8), (1, 0x31b6), (12, 0x1426), (29, 0xb57a)],
        );
    }

    #[test]
    fn hamming_above_two_is_rejected() {
        let family = Arc::new(TagFamily::from_name("36h11").expect("builtin"));
        assert!(matches!(
            CodeDictionary::new(family, 3),
            Err(FamilyError::UnsupportedHamming { max_hamming: 3 })
        ));
    }

    #[test]
    fn colliding_perturbations_keep_the_later_codeword() {
        // Codes 0b0000 and 0b0111 are three bits apart: 0b0001 is one flip
        // from the first and two flips from the second.
        let family = TagFamily {
            name: Cow::Borrowed("collide"),
            width_at_border: 4,
            total_width: 6,
            reversed_border: false,
            min_hamming: 1,
            bit_locations: Cow::Owned(vec![
                BitLocation::new(1, 1),
                BitLocation::new(2, 1),
                BitLocation::new(2, 2),
                BitLocation::new(1, 2),
            ]),
            codes: Cow::Owned(vec![0b0000, 0b0111]),
        };
        let dict = CodeDictionary::new(Arc::new(family), 2).expect("dictionary");
        let m = dict.decode(0b0001).expect("hit");
        assert_eq!((m.id, m.hamming, m.rotation), (1, 2, 0));
        let m = dict.decode(0b0000).expect("hit");
        assert_eq!((m.id, m.hamming), (0, 0));
    }
}
