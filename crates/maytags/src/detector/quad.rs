//! Quadrilateral fitting on boundary clusters.
//!
//! Points are sorted by angle around the cluster center, weighted cumulative
//! moments make any contiguous run a constant-time line fit, and corners are
//! taken at the local maxima of the line-fit error that give the four best
//! edges.

use super::clusters::{BoundaryPoint, ClusterMap};
use super::params::QuadThresholdConfig;
use maytags_core::{GrayImageView, Homography};
use nalgebra::{Point2, Vector2};
use std::ops::{Add, Sub};

/// Empirical offset of the bounding-box center that breaks ties between
/// points sitting exactly on a diagonal.
const CENTER_OFFSET: Vector2<f64> = Vector2::new(0.05118, -0.028581);

/// Fewest boundary points the four-edge line search runs on.
const MIN_FIT_POINTS: usize = 25;

/// Half-width cap of the sliding window used to score corner candidates.
const MAX_ERROR_WINDOW: usize = 20;

/// A fitted tag outline.
#[derive(Clone, Debug, PartialEq)]
pub struct Quad {
    /// Corners in image coordinates, in the cyclic order of
    /// [`maytags_core::CANONICAL_CORNERS`].
    pub corners: [Point2<f64>; 4],
    /// White-inside-black polarity of the boundary.
    pub reversed_border: bool,
    /// Canonical square `[-1, 1]^2` to image.
    pub homography: Homography,
}

impl Quad {
    /// `None` when the corners do not define a homography.
    pub fn new(corners: [Point2<f64>; 4], reversed_border: bool) -> Option<Self> {
        let homography = Homography::from_canonical_corners(&corners)?;
        Some(Self {
            corners,
            reversed_border,
            homography,
        })
    }

    /// Map a canonical-square point into the image.
    #[inline]
    pub fn project(&self, p: Point2<f64>) -> Point2<f64> {
        self.homography.apply(p)
    }

    /// Corners scaled back from an image decimated by `factor`.
    pub fn undecimated(&self, factor: u32) -> Option<Self> {
        let f = factor as f64;
        let corners = self
            .corners
            .map(|p| Point2::new((p.x - 0.5) * f + 0.5, (p.y - 0.5) * f + 0.5));
        Self::new(corners, self.reversed_border)
    }

    /// Same quad in a frame where the region origin sits at `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            corners: self.corners.map(|p| Point2::new(p.x + dx, p.y + dy)),
            reversed_border: self.reversed_border,
            homography: self.homography.translated(dx, dy),
        }
    }
}

/// Quad acceptance thresholds, derived once per detector.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadFitParams {
    pub min_cluster_pixels: usize,
    pub max_maxima: usize,
    /// Cosine of the critical corner angle.
    pub cos_critical: f64,
    pub max_line_mse: f64,
    /// Smallest tag edge, in pixels of the fitted image.
    pub min_tag_width: usize,
    pub normal_border: bool,
    pub reversed_border: bool,
}

impl QuadFitParams {
    pub fn new(
        config: &QuadThresholdConfig,
        min_tag_width: usize,
        normal_border: bool,
        reversed_border: bool,
    ) -> Self {
        Self {
            min_cluster_pixels: config.min_cluster_pixels,
            max_maxima: config.max_maxima,
            cos_critical: config.critical_angle_rad.cos(),
            max_line_mse: config.max_line_mse,
            min_tag_width,
            normal_border,
            reversed_border,
        }
    }
}

/// Weighted first and second moments of a run of points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Moment {
    pub weight: f64,
    pub mx: f64,
    pub my: f64,
    pub mxx: f64,
    pub mxy: f64,
    pub myy: f64,
}

impl Moment {
    pub fn push(&mut self, p: Point2<f64>, weight: f64) {
        self.weight += weight;
        self.mx += weight * p.x;
        self.my += weight * p.y;
        self.mxx += weight * p.x * p.x;
        self.mxy += weight * p.x * p.y;
        self.myy += weight * p.y * p.y;
    }
}

impl Add for Moment {
    type Output = Moment;
    fn add(self, o: Moment) -> Moment {
        Moment {
            weight: self.weight + o.weight,
            mx: self.mx + o.mx,
            my: self.my + o.my,
            mxx: self.mxx + o.mxx,
            mxy: self.mxy + o.mxy,
            myy: self.myy + o.myy,
        }
    }
}

impl Sub for Moment {
    type Output = Moment;
    fn sub(self, o: Moment) -> Moment {
        Moment {
            weight: self.weight - o.weight,
            mx: self.mx - o.mx,
            my: self.my - o.my,
            mxx: self.mxx - o.mxx,
            mxy: self.mxy - o.mxy,
            myy: self.myy - o.myy,
        }
    }
}

/// Total least-squares line through a point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LineFit {
    /// Weighted centroid, on the line.
    pub point: Point2<f64>,
    /// Unit normal, or zero for a degenerate set.
    pub normal: Vector2<f64>,
    /// Residual variance across the line.
    pub mse: f64,
    /// `mse` times the point count.
    pub err: f64,
}

impl LineFit {
    pub fn from_moment(m: &Moment, count: usize) -> Self {
        let ex = m.mx / m.weight;
        let ey = m.my / m.weight;
        let cxx = m.mxx / m.weight - ex * ex;
        let cxy = m.mxy / m.weight - ex * ey;
        let cyy = m.myy / m.weight - ey * ey;

        let diff = cxx - cyy;
        let discr = (diff * diff + 4.0 * cxy * cxy).sqrt();
        let small = 0.5 * (cxx + cyy - discr);
        let large = 0.5 * (cxx + cyy + discr);

        // Rows of (C - large*I) are orthogonal to the line direction.
        let n1 = Vector2::new(cxx - large, cxy);
        let n2 = Vector2::new(cxy, cyy - large);
        let n = if n2.norm_squared() > n1.norm_squared() {
            n2
        } else {
            n1
        };
        let len = n.norm();
        let normal = if len < 1e-12 { Vector2::zeros() } else { n / len };

        Self {
            point: Point2::new(ex, ey),
            normal,
            mse: small,
            err: count as f64 * small,
        }
    }

    #[inline]
    fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.normal.y, -self.normal.x)
    }
}

/// Corner `i` is where line `i` meets line `i + 1`.
pub(crate) fn intersect_lines(lines: &[LineFit; 4]) -> Option<[Point2<f64>; 4]> {
    let mut corners = [Point2::origin(); 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        let a = &lines[i];
        let b = &lines[(i + 1) % 4];
        let (da, db) = (a.direction(), b.direction());
        let det = -da.x * db.y + da.y * db.x;
        if det.abs() < 1e-3 {
            return None;
        }
        let rhs = b.point - a.point;
        let s = (-db.y * rhs.x + db.x * rhs.y) / det;
        *corner = a.point + da * s;
    }
    Some(corners)
}

/// Reusable fitting state: moment prefix sums and error profiles.
#[derive(Clone, Debug)]
pub struct QuadFitter {
    quads: Vec<Quad>,
    moments: Vec<Moment>,
    errors: Vec<f64>,
    smoothed: Vec<f64>,
    kernel: Vec<f64>,
}

impl Default for QuadFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadFitter {
    pub fn new() -> Self {
        // Gaussian with sigma 1, truncated where it falls under 5%.
        let sigma: f64 = 1.0;
        let cutoff: f64 = 0.05;
        let half = ((-cutoff.ln() * 2.0 * sigma * sigma).sqrt() + 1.0) as i32;
        let kernel = (-half..=half)
            .map(|j| (-(j * j) as f64 / (2.0 * sigma * sigma)).exp())
            .collect();
        Self {
            quads: Vec::new(),
            moments: Vec::new(),
            errors: Vec::new(),
            smoothed: Vec::new(),
            kernel,
        }
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Fit every cluster, in key order. `image` is the gray image the clusters
    /// were extracted from and weights points by local gradient strength.
    pub fn fit_quads(
        &mut self,
        image: &GrayImageView<'_>,
        clusters: &mut ClusterMap,
        params: &QuadFitParams,
    ) -> &[Quad] {
        self.quads.clear();
        for cluster in clusters.values_mut() {
            if let Some(q) = self.fit_quad(image, cluster, params) {
                self.quads.push(q);
            }
        }
        &self.quads
    }

    /// Fit one cluster; sorts and deduplicates its points in place.
    pub fn fit_quad(
        &mut self,
        image: &GrayImageView<'_>,
        cluster: &mut Vec<BoundaryPoint>,
        params: &QuadFitParams,
    ) -> Option<Quad> {
        if cluster.len() < params.min_cluster_pixels
            || cluster.len() > 3 * (2 * image.width + 2 * image.height)
        {
            return None;
        }

        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in cluster.iter() {
            x_min = x_min.min(p.position.x);
            x_max = x_max.max(p.position.x);
            y_min = y_min.min(p.position.y);
            y_max = y_max.max(p.position.y);
        }
        if (x_max - x_min) * (y_max - y_min) < params.min_tag_width as f64 {
            return None;
        }

        let center = Point2::new((x_min + x_max) * 0.5, (y_min + y_max) * 0.5) + CENTER_OFFSET;
        let mut winding = 0.0;
        for p in cluster.iter_mut() {
            let delta = p.position - center;
            winding += delta.dot(&p.gradient);
            p.slope = delta.y.atan2(delta.x);
        }
        let reversed_border = winding < 0.0;
        if (reversed_border && !params.reversed_border)
            || (!reversed_border && !params.normal_border)
        {
            return None;
        }

        cluster.sort_by(|a, b| a.slope.total_cmp(&b.slope));
        cluster.dedup_by(|a, b| a.position == b.position);
        if cluster.len() < params.min_cluster_pixels {
            return None;
        }

        self.accumulate_moments(image, cluster);
        let lines = self.find_edges(params)?;
        let corners = intersect_lines(&lines)?;

        let area = triangle_area(corners[0], corners[1], corners[2])
            + triangle_area(corners[2], corners[3], corners[0]);
        let min_width = params.min_tag_width as f64;
        if area < min_width * min_width {
            return None;
        }

        for i in 0..4 {
            let d1 = corners[(i + 1) % 4] - corners[i];
            let d2 = corners[(i + 2) % 4] - corners[(i + 1) % 4];
            let norms = (d1.norm_squared() * d2.norm_squared()).sqrt();
            if norms <= 0.0 {
                return None;
            }
            let cos = d1.dot(&d2) / norms;
            if cos.abs() > params.cos_critical || d1.perp(&d2) < 0.0 {
                return None;
            }
        }

        Quad::new(corners, reversed_border)
    }

    fn accumulate_moments(&mut self, image: &GrayImageView<'_>, cluster: &[BoundaryPoint]) {
        self.moments.clear();
        let mut acc = Moment::default();
        for p in cluster {
            let pos = p.position + Vector2::new(0.5, 0.5);
            let (ix, iy) = (pos.x as usize, pos.y as usize);
            let mut weight = 1.0;
            if ix > 0 && ix + 1 < image.width && iy > 0 && iy + 1 < image.height {
                let gx = image.pixel(ix + 1, iy) as f64 - image.pixel(ix - 1, iy) as f64;
                let gy = image.pixel(ix, iy + 1) as f64 - image.pixel(ix, iy - 1) as f64;
                weight = (gx * gx + gy * gy).sqrt() + 1.0;
            }
            acc.push(pos, weight);
            self.moments.push(acc);
        }
    }

    /// Fit the inclusive, possibly wrapping, run `start..=end`.
    fn fit_line(&self, start: usize, end: usize) -> LineFit {
        let n = self.moments.len();
        if start <= end {
            let mut m = self.moments[end];
            if start > 0 {
                m = m - self.moments[start - 1];
            }
            LineFit::from_moment(&m, end - start + 1)
        } else {
            let m = self.moments[n - 1] - self.moments[start - 1] + self.moments[end];
            LineFit::from_moment(&m, n - start + end + 1)
        }
    }

    fn find_edges(&mut self, params: &QuadFitParams) -> Option<[LineFit; 4]> {
        let n = self.moments.len();
        if n < MIN_FIT_POINTS {
            return None;
        }
        let window = MAX_ERROR_WINDOW.min(n / 12);
        if window < 2 {
            return None;
        }

        self.errors.clear();
        for i in 0..n {
            let fit = self.fit_line((i + n - window) % n, (i + window) % n);
            self.errors.push(fit.err);
        }

        let half = self.kernel.len() / 2;
        self.smoothed.clear();
        for i in 0..n {
            let v: f64 = self
                .kernel
                .iter()
                .enumerate()
                .map(|(j, k)| self.errors[(i + j + n - half) % n] * k)
                .sum();
            self.smoothed.push(v);
        }

        let s = &self.smoothed;
        let mut maxima: Vec<(usize, f64)> = (0..n)
            .filter(|&i| s[i] > s[(i + 1) % n] && s[i] > s[(i + n - 1) % n])
            .map(|i| (i, s[i]))
            .collect();
        if maxima.len() < 4 {
            return None;
        }
        if maxima.len() > params.max_maxima {
            maxima.sort_by(|a, b| b.1.total_cmp(&a.1));
            maxima.truncate(params.max_maxima);
            maxima.sort_by_key(|m| m.0);
        }

        let m = maxima.len();
        let mut best: Option<(f64, [LineFit; 4])> = None;
        for m0 in 0..m - 3 {
            let i0 = maxima[m0].0;
            for m1 in m0 + 1..m - 2 {
                let i1 = maxima[m1].0;
                let l01 = self.fit_line(i0, i1);
                if l01.mse > params.max_line_mse {
                    continue;
                }
                for m2 in m1 + 1..m - 1 {
                    let i2 = maxima[m2].0;
                    let l12 = self.fit_line(i1, i2);
                    if l12.mse > params.max_line_mse {
                        continue;
                    }
                    if l01.normal.dot(&l12.normal).abs() > params.cos_critical {
                        continue;
                    }
                    for &(i3, _) in &maxima[m2 + 1..] {
                        let l23 = self.fit_line(i2, i3);
                        if l23.mse > params.max_line_mse {
                            continue;
                        }
                        let l30 = self.fit_line(i3, i0);
                        if l30.mse > params.max_line_mse {
                            continue;
                        }
                        let err = l01.err + l12.err + l23.err + l30.err;
                        if best.as_ref().is_none_or(|(e, _)| err < *e) {
                            best = Some((err, [l01, l12, l23, l30]));
                        }
                    }
                }
            }
        }

        let (err, lines) = best?;
        (err / (n as f64) < params.max_line_mse).then_some(lines)
    }
}

fn triangle_area(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    0.5 * (b - a).perp(&(c - a)).abs()
}
