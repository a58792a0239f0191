//! Quarter-turn rotation of code words over a family's bit lattice.

use crate::{BitLocation, FamilyError, TagFamily};

/// Bit permutation rotating a code word by 90°.
///
/// The lattice turns about the tag center so that a cell at `(x, y)` lands on
/// `(W - 1 - y, x)`, `W` being `width_at_border`: in image coordinates (y down)
/// the pattern turns clockwise. A bit sitting on the rotation center maps onto
/// itself, which covers families with an odd bit count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitRotation {
    bits: usize,
    /// `target[i]` is the MSB-first index that bit `i` moves to.
    target: Vec<u8>,
}

impl BitRotation {
    pub fn new(family: &TagFamily) -> Result<Self, FamilyError> {
        let w = family.width_at_border as i32;
        let bits = family.bit_count();
        let target = family
            .bit_locations
            .iter()
            .map(|loc| {
                let rotated = BitLocation::new(w - 1 - loc.y, loc.x);
                family
                    .bit_locations
                    .iter()
                    .position(|l| *l == rotated)
                    .map(|j| j as u8)
                    .ok_or_else(|| FamilyError::InvalidFamily {
                        name: family.name.to_string(),
                        reason: format!(
                            "bit location ({}, {}) has no quarter-turn counterpart",
                            loc.x, loc.y
                        ),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bits, target })
    }

    #[inline]
    pub fn bit_count(&self) -> usize {
        self.bits
    }

    /// Rotate `word` by one quarter turn.
    pub fn rotate(&self, word: u64) -> u64 {
        let n = self.bits;
        let mut out = 0u64;
        for (i, &j) in self.target.iter().enumerate() {
            out |= ((word >> (n - 1 - i)) & 1) << (n - 1 - j as usize);
        }
        out
    }

    /// Rotate `word` by `quarter_turns` quarter turns.
    pub fn rotate_by(&self, word: u64, quarter_turns: u8) -> u64 {
        (0..quarter_turns & 3).fold(word, |w, _| self.rotate(w))
    }
}
