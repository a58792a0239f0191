use maytags::core::{GrayImage, Homography};
use maytags::family::TagFamily;
use maytags::render::draw_tag;
use maytags::{DetectionConfig, FrameReadout, PartitionConfig, PartitionedDetector};
use nalgebra::{Point2, Rotation2, Vector2};
use std::f64::consts::PI;

struct Placed {
    id: u32,
    center: Point2<f64>,
    theta: f64,
}

/// Corners of a square tag of side `side` rotated by `theta`, in canonical order.
fn square_corners(center: Point2<f64>, side: f64, theta: f64) -> [Point2<f64>; 4] {
    let r = Rotation2::new(theta);
    let h = side / 2.0;
    [(-h, -h), (h, -h), (h, h), (-h, h)].map(|(x, y)| center + r * Vector2::new(x, y))
}

fn scene(width: usize, height: usize, tags: &[Placed], side: f64) -> GrayImage {
    let family = TagFamily::from_name("36h11").expect("builtin family");
    let mut img = GrayImage::filled(width, height, 255);
    for tag in tags {
        let corners = square_corners(tag.center, side, tag.theta);
        let placement = Homography::from_canonical_corners(&corners).expect("placement");
        draw_tag(&mut img, &family, tag.id, &placement, 255, 0).expect("draw tag");
    }
    img
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(2.0 * PI);
    d.min(2.0 * PI - d)
}

fn assert_found_once(frame: &FrameReadout, tags: &[Placed], side: f64, tol: f64) {
    assert_eq!(
        frame.detections.len(),
        tags.len(),
        "detections: {:?}",
        frame.readouts()
    );
    for tag in tags {
        let hits: Vec<_> = frame.detections.iter().filter(|d| d.id == tag.id).collect();
        assert_eq!(hits.len(), 1, "tag {} found {} times", tag.id, hits.len());
        let d = hits[0];
        assert_eq!(d.hamming, 0);
        assert!(
            (d.center - tag.center).norm() < tol / 2.0,
            "tag {} center {:?} vs {:?}",
            tag.id,
            d.center,
            tag.center
        );
        assert!(
            angle_diff(d.theta(), tag.theta) < 0.02,
            "tag {} theta {} vs {}",
            tag.id,
            d.theta(),
            tag.theta
        );
        for (c, e) in d
            .corners
            .iter()
            .zip(square_corners(tag.center, side, tag.theta))
        {
            assert!((*c - e).norm() < tol, "tag {} corner {c:?} vs {e:?}", tag.id);
        }
    }
}

#[test]
fn every_worker_count_finds_each_tag_once() {
    let side = 56.0;
    let tags = [
        Placed {
            id: 0,
            center: Point2::new(80.0, 70.0),
            theta: 0.0,
        },
        Placed {
            id: 11,
            center: Point2::new(240.0, 70.0),
            theta: 30f64.to_radians(),
        },
        Placed {
            id: 123,
            center: Point2::new(80.0, 170.0),
            theta: 100f64.to_radians(),
        },
        Placed {
            id: 586,
            center: Point2::new(240.0, 170.0),
            theta: -160f64.to_radians(),
        },
    ];
    let img = scene(320, 240, &tags, side);

    let partition = PartitionConfig {
        margin: 75,
        max_workers: 6,
    };
    let mut detector =
        PartitionedDetector::new(DetectionConfig::default(), partition).expect("detector");
    for workers in 1..=6 {
        let frame = detector.detect(&img.view(), workers).expect("detect");
        assert_found_once(&frame, &tags, side, 1.0);
        assert!(frame.quad_count >= tags.len());
    }
}

#[test]
fn tag_on_a_partition_seam_is_reported_once() {
    let side = 48.0;
    // Two workers split 200 px wide frames at x = 100.
    let tags = [Placed {
        id: 42,
        center: Point2::new(100.0, 60.0),
        theta: 15f64.to_radians(),
    }];
    let img = scene(200, 120, &tags, side);

    let partition = PartitionConfig {
        margin: 75,
        max_workers: 2,
    };
    let mut detector =
        PartitionedDetector::new(DetectionConfig::default(), partition).expect("detector");
    let frame = detector.detect(&img.view(), 2).expect("detect");

    // Both overlapping partitions see the whole tag.
    assert!(frame.quad_count >= 2);
    assert_found_once(&frame, &tags, side, 1.0);

    let readout = frame.readouts()[0];
    assert_eq!(readout.id, 42);
    assert!((readout.x - 100.0).abs() < 0.5 && (readout.y - 60.0).abs() < 0.5);
}

#[test]
fn decimated_frames_keep_full_resolution_geometry() {
    let side = 64.0;
    let tags = [
        Placed {
            id: 7,
            center: Point2::new(70.0, 80.0),
            theta: 5f64.to_radians(),
        },
        Placed {
            id: 300,
            center: Point2::new(190.0, 80.0),
            theta: -40f64.to_radians(),
        },
    ];
    let img = scene(260, 160, &tags, side);

    let config = DetectionConfig {
        quad_decimate: 2,
        refine_edges: true,
        ..DetectionConfig::default()
    };
    let partition = PartitionConfig {
        margin: 75,
        max_workers: 3,
    };
    let mut detector = PartitionedDetector::new(config, partition).expect("detector");
    let frame = detector.detect(&img.view(), 3).expect("detect");
    assert_found_once(&frame, &tags, side, 1.5);
}

#[test]
fn readouts_serialize_to_json() {
    let tags = [Placed {
        id: 9,
        center: Point2::new(60.0, 60.0),
        theta: 0.0,
    }];
    let img = scene(120, 120, &tags, 48.0);
    let mut detector = PartitionedDetector::new(
        DetectionConfig::default(),
        PartitionConfig {
            margin: 20,
            max_workers: 1,
        },
    )
    .expect("detector");
    let frame = detector.detect(&img.view(), 1).expect("detect");
    let json = serde_json::to_string(&frame).expect("serialize");
    let back: FrameReadout = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.detections.len(), 1);
    assert_eq!(back.detections[0].id, 9);
    assert_eq!(back.quad_count, frame.quad_count);
}
