use crate::PixelRect;

/// Borrowed 8-bit single-channel image, row-major, `data.len() == width * height`.
///
/// Continuous coordinates place pixel `(x, y)` over `[x, x+1) x [y, y+1)`, so
/// its center sits at `(x + 0.5, y + 0.5)`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned counterpart of [`GrayImageView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl<'a> GrayImageView<'a> {
    /// Wrap a raw buffer, returning `None` when its length is not `width * height`.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Pixel lookup with signed coordinates; `None` outside the image.
    #[inline]
    pub fn try_pixel(&self, x: i64, y: i64) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.pixel(x as usize, y as usize))
    }

    /// Value of the pixel covering the continuous point `(x, y)`.
    #[inline]
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<u8> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.try_pixel(x.floor() as i64, y.floor() as i64)
    }

    /// Copy the pixels under `rect` (clipped to the image) into an owned image.
    pub fn crop(&self, rect: PixelRect) -> GrayImage {
        let rect = rect.clip(self.width, self.height);
        let mut data = Vec::with_capacity(rect.width * rect.height);
        for y in rect.y..rect.bottom() {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + rect.x..row + rect.right()]);
        }
        GrayImage {
            width: rect.width,
            height: rect.height,
            data,
        }
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Resize to `width x height`, keeping the allocation when possible.
    ///
    /// Pixel contents are unspecified afterwards; callers overwrite them.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height, 0);
    }
}

/// Bilinear interpolation at a continuous point.
///
/// Returns `None` when any of the four contributing pixel centers falls
/// outside the image.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f64, y: f64) -> Option<f64> {
    let x = x - 0.5;
    let y = y - 0.5;
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 + 1 >= src.width || y0 + 1 >= src.height {
        return None;
    }
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.pixel(x0, y0) as f64;
    let p10 = src.pixel(x0 + 1, y0) as f64;
    let p01 = src.pixel(x0, y0 + 1) as f64;
    let p11 = src.pixel(x0 + 1, y0 + 1) as f64;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    Some(a + fy * (b - a))
}
