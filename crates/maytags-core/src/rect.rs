use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle `[x, x+width) x [y, y+height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width x height` frame.
    pub const fn frame(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection with the `[0, width) x [0, height)` frame.
    pub fn clip(&self, width: usize, height: usize) -> PixelRect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        PixelRect::new(
            x,
            y,
            self.right().min(width) - x,
            self.bottom().min(height) - y,
        )
    }

    /// Grow by `margin` on every side without leaving the `width x height` frame.
    pub fn expanded(&self, margin: usize, width: usize, height: usize) -> PixelRect {
        let (x, w) = expand_axis(self.x, self.width, margin, width);
        let (y, h) = expand_axis(self.y, self.height, margin, height);
        PixelRect::new(x, y, w, h)
    }
}

fn expand_axis(start: usize, len: usize, margin: usize, limit: usize) -> (usize, usize) {
    let (start, len) = if start < margin {
        (0, len + start)
    } else {
        (start - margin, len + margin)
    };
    let len = if start + len + margin > limit {
        limit.saturating_sub(start)
    } else {
        len + margin
    };
    (start, len)
}
