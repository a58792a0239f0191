//! Re-fitting quad edges against the full resolution image.

use super::quad::{intersect_lines, LineFit, Moment, Quad};
use maytags_core::GrayImageView;
use nalgebra::{Point2, Vector2};

/// Step along the edge normal, in pixels.
const SEARCH_STEP: f64 = 0.25;

/// Re-fit each edge of `quad` through the strongest black/white transitions
/// found along its normal, then re-intersect the corners.
///
/// `search_range` bounds how far from the current edge the transition is
/// searched; decimated fits warrant a wider search. Returns `None` when an
/// edge has too few usable samples or the refined lines do not intersect.
pub fn refine_edges(image: &GrayImageView<'_>, quad: &Quad, search_range: f64) -> Option<Quad> {
    let edges = [0, 1, 2, 3].map(|edge| {
        let a = quad.corners[edge];
        let b = quad.corners[(edge + 1) % 4];
        refine_edge(image, a, b, quad.reversed_border, search_range)
    });
    let [Some(l0), Some(l1), Some(l2), Some(l3)] = edges else {
        return None;
    };

    // Line `i` spans corners `i` and `i + 1`, so it meets line `i + 1` at corner `i + 1`.
    let mut corners = intersect_lines(&[l0, l1, l2, l3])?;
    corners.rotate_right(1);
    Quad::new(corners, quad.reversed_border)
}

fn refine_edge(
    image: &GrayImageView<'_>,
    a: Point2<f64>,
    b: Point2<f64>,
    reversed_border: bool,
    search_range: f64,
) -> Option<LineFit> {
    let along = b - a;
    let length = along.norm();
    if length <= 0.0 {
        return None;
    }
    // Outward for the corner winding the fitter produces.
    let mut normal = Vector2::new(along.y, -along.x) / length;
    if reversed_border {
        normal = -normal;
    }

    let samples = ((length / 8.0) as usize).max(16);
    let mut moment = Moment::default();
    let mut count = 0;
    for s in 0..samples {
        let alpha = (1.0 + s as f64) / (samples as f64 + 1.0);
        let origin = a + along * alpha;

        let mut weighted = 0.0;
        let mut total = 0.0;
        let mut n = -search_range;
        while n <= search_range {
            let outer = origin + normal * (n + 1.0);
            let inner = origin + normal * (n - 1.0);
            if let (Some(g_out), Some(g_in)) = (
                image.pixel_at(outer.x, outer.y),
                image.pixel_at(inner.x, inner.y),
            ) {
                // Only transitions brightening outwards belong to the border.
                if g_out > g_in {
                    let d = g_out as f64 - g_in as f64;
                    weighted += d * d * n;
                    total += d * d;
                }
            }
            n += SEARCH_STEP;
        }
        if total == 0.0 {
            continue;
        }
        moment.push(origin + normal * (weighted / total), 1.0);
        count += 1;
    }

    (count >= 2).then(|| LineFit::from_moment(&moment, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use maytags_core::GrayImage;

    #[test]
    fn offset_corners_snap_to_the_true_edges() {
        let mut img = GrayImage::filled(80, 80, 230);
        for y in 20..60 {
            for x in 20..60 {
                img.set(x, y, 25);
            }
        }
        let rough = Quad::new(
            [
                Point2::new(20.6, 19.5),
                Point2::new(59.4, 20.4),
                Point2::new(60.5, 59.6),
                Point2::new(19.4, 60.3),
            ],
            false,
        )
        .expect("quad");
        let refined = refine_edges(&img.view(), &rough, 2.0).expect("refined");
        let expected = [(20.0, 20.0), (60.0, 20.0), (60.0, 60.0), (20.0, 60.0)];
        for (c, e) in refined.corners.iter().zip(expected) {
            assert_abs_diff_eq!(c.x, e.0, epsilon = 0.3);
            assert_abs_diff_eq!(c.y, e.1, epsilon = 0.3);
        }
    }

    #[test]
    fn flat_image_cannot_be_refined() {
        let img = GrayImage::filled(40, 40, 128);
        let quad = Quad::new(
            [
                Point2::new(10.0, 10.0),
                Point2::new(30.0, 10.0),
                Point2::new(30.0, 30.0),
                Point2::new(10.0, 30.0),
            ],
            false,
        )
        .expect("quad");
        assert!(refine_edges(&img.view(), &quad, 2.0).is_none());
    }
}
