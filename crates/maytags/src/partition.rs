//! Splitting a frame into one overlapping region per worker.

use crate::DetectorError;
use maytags_core::PixelRect;

/// Split `rect` into a first piece of `1/parts` of its longer side and the rest.
pub fn partition_in_two(rect: PixelRect, parts: usize) -> (PixelRect, PixelRect) {
    let parts = parts.max(1);
    if rect.height > rect.width {
        let h = rect.height / parts;
        (
            PixelRect::new(rect.x, rect.y, rect.width, h),
            PixelRect::new(rect.x, rect.y + h, rect.width, rect.height - h),
        )
    } else {
        let w = rect.width / parts;
        (
            PixelRect::new(rect.x, rect.y, w, rect.height),
            PixelRect::new(rect.x + w, rect.y, rect.width - w, rect.height),
        )
    }
}

/// Cut `rect` into `parts` rectangles of (nearly) equal area.
///
/// Even counts halve the longer side and recurse on both halves; odd counts
/// first peel off one `1/parts` slice. The order is deterministic.
pub fn partition_rectangle(rect: PixelRect, parts: usize) -> Vec<PixelRect> {
    let mut out = Vec::with_capacity(parts);
    partition_into(rect, parts, &mut out);
    out
}

fn partition_into(rect: PixelRect, parts: usize, out: &mut Vec<PixelRect>) {
    match parts {
        0 => {}
        1 => out.push(rect),
        n if n % 2 == 1 => {
            let (single, rest) = partition_in_two(rect, n);
            out.push(single);
            partition_into(rest, n - 1, out);
        }
        n => {
            let (a, b) = partition_in_two(rect, 2);
            partition_into(a, n / 2, out);
            partition_into(b, n / 2, out);
        }
    }
}

/// Grow every partition by `margin` on each side, clamped to the frame.
pub fn add_margin(width: usize, height: usize, margin: usize, partitions: &mut [PixelRect]) {
    for p in partitions.iter_mut() {
        *p = p.expanded(margin, width, height);
    }
}

/// Precomputed partition sets for every worker count up to a maximum.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionPlanner {
    width: usize,
    height: usize,
    margin: usize,
    /// `sets[n - 1]` holds the partitions for `n` workers.
    sets: Vec<Vec<PixelRect>>,
}

impl PartitionPlanner {
    pub fn new(
        width: usize,
        height: usize,
        margin: usize,
        max_workers: usize,
    ) -> Result<Self, DetectorError> {
        if max_workers == 0 {
            return Err(DetectorError::NoWorkers);
        }
        let mut planner = Self {
            width,
            height,
            margin,
            sets: vec![Vec::new(); max_workers],
        };
        planner.recompute();
        Ok(planner)
    }

    fn recompute(&mut self) {
        let frame = PixelRect::frame(self.width, self.height);
        for (i, set) in self.sets.iter_mut().enumerate() {
            *set = partition_rectangle(frame, i + 1);
            add_margin(self.width, self.height, self.margin, set);
        }
        log::debug!(
            "planned partitions of {}x{} for up to {} workers (margin {})",
            self.width,
            self.height,
            self.sets.len(),
            self.margin
        );
    }

    /// Adapt to a new frame size; a no-op when the size is unchanged.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.recompute();
    }

    #[inline]
    pub fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn margin(&self) -> usize {
        self.margin
    }

    #[inline]
    pub fn max_workers(&self) -> usize {
        self.sets.len()
    }

    /// Partitions for `workers`, clamped to `1..=max_workers`.
    pub fn partitions(&self, workers: usize) -> &[PixelRect] {
        let n = workers.clamp(1, self.sets.len());
        &self.sets[n - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rects(list: &[(usize, usize, usize, usize)]) -> Vec<PixelRect> {
        list.iter()
            .map(|&(x, y, w, h)| PixelRect::new(x, y, w, h))
            .collect()
    }

    #[test]
    fn partitions_split_equally() {
        let wide = PixelRect::frame(200, 100);
        let square = PixelRect::frame(100, 100);
        let cases = [
            (wide, 1, rects(&[(0, 0, 200, 100)])),
            (wide, 2, rects(&[(0, 0, 100, 100), (100, 0, 100, 100)])),
            (
                wide,
                3,
                rects(&[(0, 0, 66, 100), (66, 0, 67, 100), (133, 0, 67, 100)]),
            ),
            (
                square,
                3,
                rects(&[(0, 0, 33, 100), (33, 0, 67, 50), (33, 50, 67, 50)]),
            ),
            (
                wide,
                5,
                rects(&[
                    (0, 0, 40, 100),
                    (40, 0, 80, 50),
                    (40, 50, 80, 50),
                    (120, 0, 80, 50),
                    (120, 50, 80, 50),
                ]),
            ),
        ];
        for (base, n, expected) in cases {
            assert_eq!(partition_rectangle(base, n), expected, "{n} parts of {base:?}");
        }
    }

    #[test]
    fn margins_are_clamped_to_the_frame() {
        let mut parts = partition_rectangle(PixelRect::frame(200, 100), 5);
        add_margin(200, 100, 5, &mut parts);
        assert_eq!(
            parts,
            rects(&[
                (0, 0, 45, 100),
                (35, 0, 90, 55),
                (35, 45, 90, 55),
                (115, 0, 85, 55),
                (115, 45, 85, 55),
            ])
        );
    }

    #[test]
    fn expanded_partitions_stay_inside_and_cover_their_base() {
        for (w, h) in [(640, 480), (97, 203), (1, 1), (5, 3000)] {
            let frame = PixelRect::frame(w, h);
            for n in 1..=9 {
                let base = partition_rectangle(frame, n);
                assert_eq!(base.len(), n);
                assert_eq!(base.iter().map(PixelRect::area).sum::<usize>(), w * h);
                for margin in [0, 3, 75, 10_000] {
                    let mut grown = base.clone();
                    add_margin(w, h, margin, &mut grown);
                    for (g, b) in grown.iter().zip(&base) {
                        assert!(frame.contains_rect(g), "{g:?} outside {w}x{h}");
                        assert!(g.contains_rect(b), "{g:?} lost {b:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn planner_caches_per_worker_count() {
        let mut planner = PartitionPlanner::new(200, 100, 5, 6).expect("planner");
        assert_eq!(planner.partitions(0).len(), 1);
        assert_eq!(planner.partitions(5).len(), 5);
        assert_eq!(planner.partitions(50).len(), 6);
        assert_eq!(planner.partitions(5)[1], PixelRect::new(35, 0, 90, 55));

        planner.resize(100, 100);
        assert_eq!(planner.frame_size(), (100, 100));
        assert_eq!(planner.partitions(3)[0], PixelRect::new(0, 0, 38, 100));

        assert!(matches!(
            PartitionPlanner::new(10, 10, 0, 0),
            Err(DetectorError::NoWorkers)
        ));
    }
}
