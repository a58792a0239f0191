//! Tile-local adaptive thresholding into a three-valued label map.

use maytags_core::GrayImageView;

/// Tile edge, in pixels.
pub const TILE_SIZE: usize = 4;

/// Per-pixel label. Discriminants are the gray levels of the label map drawn
/// as an image, so complementary labels sum to 255.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Label {
    Black = 0,
    Indeterminate = 127,
    White = 255,
}

impl Label {
    #[inline]
    pub fn value(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_determinate(self) -> bool {
        self != Label::Indeterminate
    }

    /// True for a black/white pair.
    #[inline]
    pub fn is_complement_of(self, other: Label) -> bool {
        self.value() as u16 + other.value() as u16 == 255
    }
}

/// Labels of one region, row-major.
#[derive(Clone, Debug, Default)]
pub struct LabelMap {
    width: usize,
    height: usize,
    labels: Vec<Label>,
}

impl LabelMap {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Label {
        self.labels[y * self.width + x]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }

    fn reshape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.labels.resize(width * height, Label::Indeterminate);
    }
}

/// Reusable thresholding state; buffers follow the size of the last region.
#[derive(Clone, Debug, Default)]
pub struct Thresholder {
    map: LabelMap,
    tile_min: Vec<u8>,
    tile_max: Vec<u8>,
    dilated_min: Vec<u8>,
    dilated_max: Vec<u8>,
}

impl Thresholder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label `image`, writing every pixel of the returned map.
    ///
    /// Pixels past the last full tile borrow the statistics of the nearest tile.
    /// A region smaller than one tile is entirely indeterminate.
    pub fn threshold(&mut self, image: &GrayImageView<'_>, min_white_black_diff: u8) -> &LabelMap {
        let (w, h) = (image.width, image.height);
        self.map.reshape(w, h);

        let tw = w / TILE_SIZE;
        let th = h / TILE_SIZE;
        if tw == 0 || th == 0 {
            self.map.labels.fill(Label::Indeterminate);
            return &self.map;
        }

        self.tile_statistics(image, tw, th);
        self.dilate(tw, th);

        for y in 0..h {
            let ty = (y / TILE_SIZE).min(th - 1);
            let row = &image.data[y * w..(y + 1) * w];
            let out = &mut self.map.labels[y * w..(y + 1) * w];
            for (x, (&v, label)) in row.iter().zip(out.iter_mut()).enumerate() {
                let t = ty * tw + (x / TILE_SIZE).min(tw - 1);
                let lo = self.dilated_min[t];
                let hi = self.dilated_max[t];
                *label = if hi - lo < min_white_black_diff {
                    Label::Indeterminate
                } else if v > lo + (hi - lo) / 2 {
                    Label::White
                } else {
                    Label::Black
                };
            }
        }
        &self.map
    }

    fn tile_statistics(&mut self, image: &GrayImageView<'_>, tw: usize, th: usize) {
        self.tile_min.clear();
        self.tile_max.clear();
        for ty in 0..th {
            for tx in 0..tw {
                let mut lo = u8::MAX;
                let mut hi = u8::MIN;
                for dy in 0..TILE_SIZE {
                    let start = (ty * TILE_SIZE + dy) * image.width + tx * TILE_SIZE;
                    for &v in &image.data[start..start + TILE_SIZE] {
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                }
                self.tile_min.push(lo);
                self.tile_max.push(hi);
            }
        }
    }

    fn dilate(&mut self, tw: usize, th: usize) {
        self.dilated_min.clear();
        self.dilated_max.clear();
        for ty in 0..th {
            for tx in 0..tw {
                let mut lo = u8::MAX;
                let mut hi = u8::MIN;
                for ny in ty.saturating_sub(1)..=(ty + 1).min(th - 1) {
                    for nx in tx.saturating_sub(1)..=(tx + 1).min(tw - 1) {
                        lo = lo.min(self.tile_min[ny * tw + nx]);
                        hi = hi.max(self.tile_max[ny * tw + nx]);
                    }
                }
                self.dilated_min.push(lo);
                self.dilated_max.push(hi);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maytags_core::GrayImage;

    fn noise(width: usize, height: usize, seed: u32) -> GrayImage {
        let mut state = seed;
        let mut img = GrayImage::new(width, height);
        for v in img.data.iter_mut() {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *v = (state >> 24) as u8;
        }
        img
    }

    /// Brute-force 3x3 tile neighborhood statistics of the tile covering `(x, y)`.
    fn neighborhood(img: &GrayImage, x: usize, y: usize) -> (u8, u8) {
        let tw = img.width / TILE_SIZE;
        let th = img.height / TILE_SIZE;
        let tx = (x / TILE_SIZE).min(tw - 1) as i64;
        let ty = (y / TILE_SIZE).min(th - 1) as i64;
        let (mut lo, mut hi) = (255u8, 0u8);
        for py in 0..th * TILE_SIZE {
            for px in 0..tw * TILE_SIZE {
                let ptx = (px / TILE_SIZE) as i64;
                let pty = (py / TILE_SIZE) as i64;
                if (ptx - tx).abs() <= 1 && (pty - ty).abs() <= 1 {
                    lo = lo.min(img.pixel(px, py));
                    hi = hi.max(img.pixel(px, py));
                }
            }
        }
        (lo, hi)
    }

    #[test]
    fn labels_follow_neighborhood_midpoint() {
        let img = noise(23, 18, 7);
        let mut t = Thresholder::new();
        let map = t.threshold(&img.view(), 40).clone();
        for y in 0..img.height {
            for x in 0..img.width {
                let (lo, hi) = neighborhood(&img, x, y);
                let expected = if hi - lo < 40 {
                    Label::Indeterminate
                } else if img.pixel(x, y) as u16 > (lo as u16 + hi as u16) / 2 {
                    Label::White
                } else {
                    Label::Black
                };
                assert_eq!(map.get(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn low_contrast_tiles_are_indeterminate() {
        let mut img = GrayImage::filled(16, 16, 100);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v += (i % 3) as u8;
        }
        let mut t = Thresholder::new();
        let map = t.threshold(&img.view(), 5);
        assert!(map.as_slice().iter().all(|&l| l == Label::Indeterminate));
    }

    #[test]
    fn step_edge_splits_black_and_white() {
        let mut img = GrayImage::filled(16, 8, 20);
        for y in 0..8 {
            for x in 8..16 {
                img.set(x, y, 220);
            }
        }
        let mut t = Thresholder::new();
        let map = t.threshold(&img.view(), 5);
        assert_eq!(map.get(7, 3), Label::Black);
        assert_eq!(map.get(8, 3), Label::White);
        assert!(map.get(7, 3).is_complement_of(map.get(8, 3)));
        assert_eq!(map.get(0, 0), Label::Indeterminate);
        assert_eq!(map.get(15, 7), Label::Indeterminate);
    }

    #[test]
    fn buffers_track_region_size_changes() {
        let mut t = Thresholder::new();
        let big = noise(40, 40, 3);
        t.threshold(&big.view(), 0);
        let small = GrayImage::filled(9, 6, 50);
        let map = t.threshold(&small.view(), 1);
        assert_eq!((map.width(), map.height()), (9, 6));
        assert_eq!(map.as_slice().len(), 54);
        assert!(map.as_slice().iter().all(|&l| l == Label::Indeterminate));

        let tiny = GrayImage::filled(3, 20, 0);
        let map = t.threshold(&tiny.view(), 0);
        assert!(map.as_slice().iter().all(|&l| l == Label::Indeterminate));
    }
}
