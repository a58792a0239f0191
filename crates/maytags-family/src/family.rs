//! Tag family descriptions.

use crate::{builtins, FamilyError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::{fs, path::Path};

/// Lattice cell of one coded bit, in cells from the top-left corner of the
/// black border (`0..width_at_border` spans the border square).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct BitLocation {
    pub x: i32,
    pub y: i32,
}

impl BitLocation {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for BitLocation {
    fn from([x, y]: [i32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<BitLocation> for [i32; 2] {
    fn from(loc: BitLocation) -> Self {
        [loc.x, loc.y]
    }
}

/// Geometry and codewords of one tag family.
///
/// Bit `i` of a code word is stored MSB first: the bit sampled at
/// `bit_locations[0]` is the most significant of the `bit_count()` bits.
/// A set bit is a white cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagFamily {
    pub name: Cow<'static, str>,
    /// Side of the black border square, in cells.
    pub width_at_border: u32,
    /// Side of the whole printed tag, in cells.
    pub total_width: u32,
    /// True when the border is white on a black surround.
    pub reversed_border: bool,
    /// Minimum Hamming distance between codewords, rotations included.
    pub min_hamming: u32,
    pub bit_locations: Cow<'static, [BitLocation]>,
    #[serde(with = "hex_codes")]
    pub codes: Cow<'static, [u64]>,
}

impl TagFamily {
    /// Resolve an embedded family by name.
    pub fn from_name(name: &str) -> Result<Self, FamilyError> {
        builtins::builtin_family(name)
            .cloned()
            .ok_or_else(|| FamilyError::UnknownFamily {
                name: name.to_string(),
                known: builtins::builtin_names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Parse and validate a family from its JSON description.
    pub fn from_json_str(raw: &str) -> Result<Self, FamilyError> {
        let family: TagFamily = serde_json::from_str(raw)?;
        family.validate()?;
        Ok(family)
    }

    /// Load and validate a family from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FamilyError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    #[inline]
    pub fn bit_count(&self) -> usize {
        self.bit_locations.len()
    }

    /// Offset of the first printed cell relative to the border square.
    ///
    /// Negative for families whose white quiet zone lies outside the border.
    #[inline]
    pub fn lattice_origin(&self) -> i32 {
        (self.width_at_border as i32 - self.total_width as i32) / 2
    }

    /// Check the structural invariants the decoder relies on.
    pub fn validate(&self) -> Result<(), FamilyError> {
        let invalid = |reason: String| FamilyError::InvalidFamily {
            name: self.name.to_string(),
            reason,
        };

        let bits = self.bit_count();
        if bits == 0 || bits > 64 {
            return Err(invalid(format!("{bits} coded bits (expected 1..=64)")));
        }
        if self.width_at_border < 3 {
            return Err(invalid(format!(
                "width_at_border {} is too small",
                self.width_at_border
            )));
        }
        if self.total_width < self.width_at_border {
            return Err(invalid(format!(
                "total_width {} is smaller than width_at_border {}",
                self.total_width, self.width_at_border
            )));
        }
        if self.codes.is_empty() {
            return Err(invalid("no codewords".to_string()));
        }
        if self.codes.len() > u16::MAX as usize + 1 {
            return Err(invalid(format!("{} codewords", self.codes.len())));
        }
        if bits < 64 {
            if let Some(code) = self.codes.iter().find(|&&c| c >> bits != 0) {
                return Err(invalid(format!("code {code:#x} is wider than {bits} bits")));
            }
        }

        let origin = self.lattice_origin();
        let end = origin + self.total_width as i32;
        let mut seen = HashSet::with_capacity(bits);
        for loc in self.bit_locations.iter() {
            if loc.x < origin || loc.y < origin || loc.x >= end || loc.y >= end {
                return Err(invalid(format!(
                    "bit location ({}, {}) lies outside the tag",
                    loc.x, loc.y
                )));
            }
            if !seen.insert(*loc) {
                return Err(invalid(format!(
                    "bit location ({}, {}) is used twice",
                    loc.x, loc.y
                )));
            }
        }
        Ok(())
    }
}

mod hex_codes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::borrow::Cow;

    pub fn serialize<S: Serializer>(codes: &Cow<'static, [u64]>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(codes.iter().map(|c| format!("{c:#x}")))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Cow<'static, [u64]>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| {
                u64::from_str_radix(s.trim_start_matches("0x"), 16)
                    .map_err(|e| D::Error::custom(format!("invalid code `{s}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_family() -> TagFamily {
        TagFamily {
            name: Cow::Borrowed("tiny"),
            width_at_border: 4,
            total_width: 6,
            reversed_border: false,
            min_hamming: 1,
            bit_locations: Cow::Owned(vec![
                BitLocation::new(1, 1),
                BitLocation::new(2, 1),
                BitLocation::new(1, 2),
                BitLocation::new(2, 2),
            ]),
            codes: Cow::Owned(vec![0b1000, 0b0110]),
        }
    }

    #[test]
    fn unknown_name_lists_known_families() {
        let err = TagFamily::from_name("41h12").expect_err("unknown");
        let msg = err.to_string();
        assert!(msg.contains("41h12") && msg.contains("36h11"), "{msg}");
    }

    #[test]
    fn json_round_trip_keeps_codes() {
        let family = TagFamily::from_name("16h5").expect("builtin");
        let json = serde_json::to_string(&family).expect("serialize");
        assert!(json.contains("\"0x"));
        let back = TagFamily::from_json_str(&json).expect("parse");
        assert_eq!(back, family);
    }

    #[test]
    fn load_json_reads_custom_family() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiny.json");
        fs::write(&path, serde_json::to_string_pretty(&tiny_family()).expect("json"))
            .expect("write");
        let family = TagFamily::load_json(&path).expect("load");
        assert_eq!(family.bit_count(), 4);
        assert_eq!(family.lattice_origin(), -1);
    }

    #[test]
    fn validation_rejects_wide_codes_and_bad_locations() {
        let mut family = tiny_family();
        family.codes = Cow::Owned(vec![0b1_0000]);
        assert!(matches!(
            family.validate(),
            Err(FamilyError::InvalidFamily { .. })
        ));

        let mut family = tiny_family();
        family.bit_locations.to_mut()[3] = BitLocation::new(1, 1);
        assert!(family.validate().is_err());

        let mut family = tiny_family();
        family.bit_locations.to_mut()[0] = BitLocation::new(9, 1);
        assert!(family.validate().is_err());
    }
}
