//! Image conditioning ahead of quad search: decimation and Gaussian filtering.

use maytags_core::{GrayImage, GrayImageView};

/// Keep every `factor`-th pixel, starting at the top-left one.
pub fn decimate(image: &GrayImageView<'_>, factor: u32) -> GrayImage {
    let f = factor.max(1) as usize;
    let (w, h) = (image.width / f, image.height / f);
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let src = &image.data[y * f * image.width..];
        let dst = &mut out.data[y * w..(y + 1) * w];
        for (x, v) in dst.iter_mut().enumerate() {
            *v = src[x * f];
        }
    }
    out
}

/// Kernel width for `sigma`: about two standard deviations each side, odd.
pub fn kernel_size(sigma: f32) -> usize {
    let ksz = (4.0 * sigma.abs()) as usize;
    ksz | 1
}

fn gaussian_kernel(sigma: f64, ksz: usize) -> Vec<f64> {
    let half = (ksz / 2) as f64;
    let mut k: Vec<f64> = (0..ksz)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = k.iter().sum();
    for v in k.iter_mut() {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur with replicated borders, in place.
pub fn gaussian_blur(image: &mut GrayImage, sigma: f64, ksz: usize) {
    let (w, h) = (image.width, image.height);
    if w == 0 || h == 0 || ksz < 3 {
        return;
    }
    let kernel = gaussian_kernel(sigma, ksz);
    let half = (ksz / 2) as isize;
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    let mut rows = vec![0.0f64; w * h];
    for y in 0..h {
        let src = &image.data[y * w..(y + 1) * w];
        for x in 0..w {
            rows[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * src[clamp(x as isize + i as isize - half, w)] as f64)
                .sum();
        }
    }
    for y in 0..h {
        for x in 0..w {
            let v: f64 = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * rows[clamp(y as isize + i as isize - half, h) * w + x])
                .sum();
            image.data[y * w + x] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Apply `quad_sigma`: blur when positive, unsharp mask when negative.
///
/// Returns `false` when the kernel would be a single pixel and nothing changed.
pub fn apply_quad_sigma(image: &mut GrayImage, quad_sigma: f32) -> bool {
    let ksz = kernel_size(quad_sigma);
    if quad_sigma == 0.0 || ksz <= 1 {
        return false;
    }
    let sigma = quad_sigma.abs() as f64;
    if quad_sigma > 0.0 {
        gaussian_blur(image, sigma, ksz);
        return true;
    }
    let original = image.data.clone();
    gaussian_blur(image, sigma, ksz);
    for (v, &o) in image.data.iter_mut().zip(&original) {
        let sharpened = 2 * o as i32 - *v as i32;
        *v = sharpened.clamp(0, 255) as u8;
    }
    true
}
