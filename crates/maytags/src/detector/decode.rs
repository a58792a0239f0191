//! Sampling a quad's bit lattice and resolving the code word.

use super::gray_model::GrayModel;
use super::quad::Quad;
use super::result::Detection;
use maytags_core::{sample_bilinear, GrayImageView};
use maytags_family::CodeDictionary;
use nalgebra::{Point2, Vector2};
use std::sync::Arc;

/// A run of `width_at_border` border-adjacent cells, all expected white or
/// all expected black.
#[derive(Clone, Copy, Debug)]
struct BorderSampler {
    start: Vector2<f64>,
    step: Vector2<f64>,
    white: bool,
}

/// Per-family decoder; holds scratch buffers, so one per worker.
#[derive(Clone, Debug)]
pub struct PayloadDecoder {
    dictionary: Arc<CodeDictionary>,
    sharpening: f64,
    samplers: [BorderSampler; 8],
    sampled: Vec<f64>,
    sharpened: Vec<f64>,
}

impl PayloadDecoder {
    pub fn new(dictionary: Arc<CodeDictionary>, sharpening: f64) -> Self {
        let w = dictionary.family().width_at_border as f64;
        let down = Vector2::new(0.0, 1.0);
        let right = Vector2::new(1.0, 0.0);
        let sampler = |x: f64, y: f64, step: Vector2<f64>, white: bool| BorderSampler {
            start: Vector2::new(x, y),
            step,
            white,
        };
        // Outside the border is white, the border itself black.
        let samplers = [
            sampler(-0.5, 0.5, down, true),
            sampler(0.5, 0.5, down, false),
            sampler(w + 0.5, 0.5, down, true),
            sampler(w - 0.5, 0.5, down, false),
            sampler(0.5, -0.5, right, true),
            sampler(0.5, 0.5, right, false),
            sampler(0.5, w + 0.5, right, true),
            sampler(0.5, w - 0.5, right, false),
        ];
        let cells = (dictionary.family().total_width as usize).pow(2);
        Self {
            dictionary,
            sharpening,
            samplers,
            sampled: vec![0.0; cells],
            sharpened: vec![0.0; cells],
        }
    }

    pub fn dictionary(&self) -> &Arc<CodeDictionary> {
        &self.dictionary
    }

    /// Lattice coordinates (border square spans `0..width_at_border`) to the
    /// canonical square.
    #[inline]
    fn canonical(&self, lattice: Vector2<f64>) -> Point2<f64> {
        let w = self.dictionary.family().width_at_border as f64;
        Point2::new(2.0 * lattice.x / w - 1.0, 2.0 * lattice.y / w - 1.0)
    }

    /// Decode `quad` against `image`, the full resolution region it was found in.
    ///
    /// `None` for a border polarity that does not match the family, an
    /// unsolvable lighting model or a code word absent from the dictionary.
    pub fn decode(&mut self, image: &GrayImageView<'_>, quad: &Quad) -> Option<Detection> {
        let family = Arc::clone(self.dictionary.family());
        let w = family.width_at_border as usize;

        let mut white = GrayModel::new();
        let mut black = GrayModel::new();
        for sampler in &self.samplers {
            for j in 0..w {
                let c = self.canonical(sampler.start + sampler.step * j as f64);
                let p = quad.project(c);
                let Some(v) = image.pixel_at(p.x, p.y) else {
                    continue;
                };
                let model = if sampler.white { &mut white } else { &mut black };
                model.add(c, v as f64);
            }
        }
        let white = white.solve()?;
        let black = black.solve()?;

        let origin = Point2::origin();
        let inverted = white.interpolate(origin) - black.interpolate(origin) < 0.0;
        if inverted != family.reversed_border {
            return None;
        }

        let t = family.total_width as usize;
        let lattice_origin = family.lattice_origin();
        let cell = |x: i32, y: i32| (y - lattice_origin) as usize * t + (x - lattice_origin) as usize;

        self.sampled.fill(0.0);
        for loc in family.bit_locations.iter() {
            let c = self.canonical(Vector2::new(loc.x as f64 + 0.5, loc.y as f64 + 0.5));
            let p = quad.project(c);
            let Some(v) = sample_bilinear(image, p.x, p.y) else {
                continue;
            };
            let threshold = 0.5 * (white.interpolate(c) + black.interpolate(c));
            self.sampled[cell(loc.x, loc.y)] = v - threshold;
        }
        self.sharpen(t);

        let mut code = 0u64;
        let (mut white_score, mut white_count) = (0.0, 0u32);
        let (mut black_score, mut black_count) = (0.0, 0u32);
        for loc in family.bit_locations.iter() {
            let v = self.sharpened[cell(loc.x, loc.y)];
            code <<= 1;
            if v > 0.0 {
                code |= 1;
                white_score += v;
                white_count += 1;
            } else {
                black_score -= v;
                black_count += 1;
            }
        }

        let m = self.dictionary.decode(code)?;
        let margin = f64::min(
            white_score / white_count.max(1) as f64,
            black_score / black_count.max(1) as f64,
        );
        log::trace!(
            "decoded {} id {} (hamming {}, rotation {}, margin {:.2})",
            family.name,
            m.id,
            m.hamming,
            m.rotation,
            margin
        );
        Some(Detection::from_homography(
            &family.name,
            m.id,
            m.hamming,
            m.rotation,
            margin,
            quad.homography.rotated_quarter_turns(m.rotation),
        ))
    }

    /// `sharpened = sampled + sharpening * laplacian(sampled)`, borders replicated.
    fn sharpen(&mut self, t: usize) {
        let s = &self.sampled;
        let at = |x: isize, y: isize| {
            let x = x.clamp(0, t as isize - 1) as usize;
            let y = y.clamp(0, t as isize - 1) as usize;
            s[y * t + x]
        };
        for y in 0..t as isize {
            for x in 0..t as isize {
                let laplacian =
                    4.0 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1);
                self.sharpened[y as usize * t + x as usize] = at(x, y) + self.sharpening * laplacian;
            }
        }
    }
}
