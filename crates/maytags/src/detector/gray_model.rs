use nalgebra::{Matrix3, Point2, Vector3};

/// Least-squares plane `intensity = a*x + b*y + c` over sampled points.
#[derive(Clone, Debug, Default)]
pub struct GrayModel {
    ata: Matrix3<f64>,
    atb: Vector3<f64>,
    samples: usize,
}

/// Fitted plane coefficients `(a, b, c)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrayPlane(pub Vector3<f64>);

impl GrayModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one sample; only the upper triangle of the normal matrix is kept.
    pub fn add(&mut self, position: Point2<f64>, gray: f64) {
        let (x, y) = (position.x, position.y);
        self.ata[(0, 0)] += x * x;
        self.ata[(0, 1)] += x * y;
        self.ata[(0, 2)] += x;
        self.ata[(1, 1)] += y * y;
        self.ata[(1, 2)] += y;
        self.ata[(2, 2)] += 1.0;
        self.atb += Vector3::new(x, y, 1.0) * gray;
        self.samples += 1;
    }

    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Solve the normal equations, `None` when no plane is determined.
    pub fn solve(&self) -> Option<GrayPlane> {
        if self.samples == 0 {
            return None;
        }
        let mut a = self.ata;
        a[(1, 0)] = a[(0, 1)];
        a[(2, 0)] = a[(0, 2)];
        a[(2, 1)] = a[(1, 2)];

        let solution = match a.cholesky() {
            Some(chol) => chol.solve(&self.atb),
            None => a.lu().solve(&self.atb)?,
        };
        solution
            .iter()
            .all(|v| v.is_finite())
            .then_some(GrayPlane(solution))
    }
}

impl GrayPlane {
    #[inline]
    pub fn interpolate(&self, position: Point2<f64>) -> f64 {
        self.0.dot(&Vector3::new(position.x, position.y, 1.0))
    }
}
