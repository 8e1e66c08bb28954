#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn vp(zoom: f64, pan_x: f64, pan_y: f64) -> Viewport {
    Viewport { zoom, pan: Point::new(pan_x, pan_y) }
}

// --- Point ---

#[test]
fn point_distance_pythagorean() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(30.0, 40.0)), 50.0));
}

#[test]
fn point_delta_and_offset_are_inverse() {
    let a = Point::new(3.0, -4.0);
    let b = Point::new(10.0, 2.5);
    assert!(point_approx_eq(b.delta(a).offset(a), b));
}

#[test]
fn point_is_finite_rejects_nan() {
    assert!(Point::new(1.0, 2.0).is_finite());
    assert!(!Point::new(f64::NAN, 2.0).is_finite());
    assert!(!Point::new(1.0, f64::INFINITY).is_finite());
}

// --- Viewport defaults ---

#[test]
fn viewport_default_is_identity() {
    let v = Viewport::default();
    assert_eq!(v.zoom, 1.0);
    assert_eq!(v.pan, Point::ORIGIN);
}

// --- screen_to_world ---

#[test]
fn screen_to_world_identity() {
    let world = Viewport::default().screen_to_world(Point::new(50.0, 75.0), Point::ORIGIN);
    assert!(point_approx_eq(world, Point::new(50.0, 75.0)));
}

#[test]
fn screen_to_world_subtracts_origin_and_pan_then_divides_by_zoom() {
    let v = vp(2.0, 10.0, 20.0);
    let world = v.screen_to_world(Point::new(130.0, 140.0), Point::new(20.0, 20.0));
    assert!(point_approx_eq(world, Point::new(50.0, 50.0)));
}

#[test]
fn world_to_screen_inverse_of_screen_to_world() {
    let origins = [Point::ORIGIN, Point::new(12.5, 80.0), Point::new(-3.0, 1000.0)];
    let viewports = [vp(1.0, 0.0, 0.0), vp(0.5, -40.0, 33.3), vp(3.0, 1234.5, -987.6), vp(1.75, 0.1, 0.2)];
    let points = [Point::new(0.0, 0.0), Point::new(1.0e4, -2.5e3), Point::new(-17.3, 99.9)];
    for origin in origins {
        for v in viewports {
            for p in points {
                let back = v.world_to_screen(v.screen_to_world(p, origin), origin);
                assert!(point_approx_eq(back, p), "{p:?} via {v:?} came back as {back:?}");
            }
        }
    }
}

#[test]
fn screen_delta_to_world_divides_by_zoom() {
    let d = vp(2.0, 0.0, 0.0).screen_delta_to_world(Point::new(50.0, 0.0));
    assert!(point_approx_eq(d, Point::new(25.0, 0.0)));
}

// --- zoom clamping ---

#[test]
fn zoom_in_three_times_then_reset() {
    let v = Viewport::default().zoomed_in().zoomed_in().zoomed_in();
    assert!(approx_eq(v.zoom, 1.75));
    let v = Viewport::reset();
    assert_eq!(v.zoom, 1.0);
    assert_eq!(v.pan, Point::ORIGIN);
}

#[test]
fn zoom_in_clamps_at_max() {
    let mut v = Viewport::default();
    for _ in 0..20 {
        v = v.zoomed_in();
    }
    assert_eq!(v.zoom, MAX_ZOOM);
}

#[test]
fn zoom_out_clamps_at_min() {
    let mut v = Viewport::default();
    for _ in 0..20 {
        v = v.zoomed_out();
    }
    assert_eq!(v.zoom, MIN_ZOOM);
}

#[test]
fn zoom_stays_in_bounds_for_mixed_sequences() {
    let mut v = Viewport::default();
    let steps = [1, 1, -1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 1];
    for s in steps {
        v = if s > 0 { v.zoomed_in() } else { v.zoomed_out() };
        assert!((MIN_ZOOM..=MAX_ZOOM).contains(&v.zoom));
    }
    for z in [-10.0, 0.0, 0.49, 3.01, 100.0, f64::MAX] {
        let zoom = v.with_zoom(z).zoom;
        assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom));
    }
}

#[test]
fn with_zoom_rejects_nan() {
    let v = vp(1.5, 0.0, 0.0).with_zoom(f64::NAN);
    assert_eq!(v.zoom, 1.5);
}

#[test]
fn with_pan_rejects_non_finite() {
    let v = vp(1.0, 5.0, 6.0).with_pan(Point::new(f64::NAN, 1.0));
    assert_eq!(v.pan, Point::new(5.0, 6.0));
}

#[test]
fn sanitized_clamps_and_falls_back() {
    let fallback = vp(1.25, 7.0, 8.0);
    let incoming = Viewport { zoom: 9.0, pan: Point::new(f64::INFINITY, 0.0) };
    let v = incoming.sanitized(fallback);
    assert_eq!(v.zoom, MAX_ZOOM);
    assert_eq!(v.pan, Point::new(7.0, 8.0));
}

// --- distance_units ---

#[test]
fn distance_units_at_zoom_one() {
    assert_eq!(distance_units(50.0, 1.0), 10.0);
}

#[test]
fn distance_units_invariant_to_zoom_for_same_world_points() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(30.0, 40.0);
    for zoom in [0.5, 1.0, 1.75, 3.0] {
        let v = vp(zoom, 11.0, -4.0);
        let screen = v.world_to_screen(a, Point::ORIGIN).distance(v.world_to_screen(b, Point::ORIGIN));
        assert_eq!(distance_units(screen, zoom), 10.0);
    }
}

#[test]
fn distance_units_rounds() {
    assert_eq!(distance_units(12.0, 1.0), 2.0);
    assert_eq!(distance_units(13.0, 1.0), 3.0);
}
