//! Floating point helpers for arcs and distance measurement.
//!
//! Coordinates are stored as integers; these helpers are only used where a
//! derived value (arc center, flattened arc points, clearances) is needed.

use super::{Angle, Length, Point, PositiveLength};

/// A point in floating point nanometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FPoint {
    pub x: f64,
    pub y: f64,
}

impl FPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: FPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn to_point(self) -> Point {
        Point::from_nm(self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<Point> for FPoint {
    fn from(p: Point) -> Self {
        Self::new(p.x.to_nm() as f64, p.y.to_nm() as f64)
    }
}

/// Center of the arc from `p1` to `p2` sweeping `angle`.
///
/// Returns `None` for a straight segment or a zero-length chord.
pub fn arc_center(p1: Point, p2: Point, angle: Angle) -> Option<FPoint> {
    if angle.is_zero() || p1 == p2 {
        return None;
    }
    let a = FPoint::from(p1);
    let b = FPoint::from(p2);
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let chord = dx.hypot(dy);
    let half = angle.to_rad() / 2.0;
    // Signed distance from the chord midpoint to the center, along the left normal.
    let offset = (chord / 2.0) * half.cos() / half.sin();
    let (nx, ny) = (-dy / chord, dx / chord);
    Some(FPoint::new(
        (a.x + b.x) / 2.0 + nx * offset,
        (a.y + b.y) / 2.0 + ny * offset,
    ))
}

/// Radius of the arc from `p1` to `p2` sweeping `angle`, zero for straight segments.
pub fn arc_radius(p1: Point, p2: Point, angle: Angle) -> Length {
    if angle.is_zero() {
        return Length::zero();
    }
    let chord = p1.distance_to(p2);
    let radius = chord / (2.0 * (angle.to_rad() / 2.0).sin().abs());
    Length::new(radius.round() as i64)
}

/// Flatten an arc into a polyline whose sagitta never exceeds `tolerance`.
///
/// The returned points exclude `p1` and always end exactly at `p2`.
pub fn flatten_arc(p1: Point, p2: Point, angle: Angle, tolerance: PositiveLength) -> Vec<Point> {
    let Some(center) = arc_center(p1, p2, angle) else {
        return vec![p2];
    };
    let start = FPoint::from(p1);
    let radius = start.distance_to(center);
    let tol = tolerance.get().to_nm() as f64;
    let sweep = angle.to_rad();
    let max_step = if tol >= radius {
        std::f64::consts::PI
    } else {
        2.0 * (1.0 - tol / radius).acos()
    };
    let steps = ((sweep.abs() / max_step).ceil() as usize).max(1);
    let start_angle = (start.y - center.y).atan2(start.x - center.x);
    let mut points = Vec::with_capacity(steps);
    for i in 1..steps {
        let a = start_angle + sweep * i as f64 / steps as f64;
        points.push(
            FPoint::new(center.x + radius * a.cos(), center.y + radius * a.sin()).to_point(),
        );
    }
    points.push(p2);
    points
}

pub fn distance_point_segment(p: FPoint, a: FPoint, b: FPoint) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(FPoint::new(a.x + t * dx, a.y + t * dy))
}

fn orientation(a: FPoint, b: FPoint, c: FPoint) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(p: FPoint, a: FPoint, b: FPoint) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True if the closed segments `a1-a2` and `b1-b2` share at least one point.
pub fn segments_intersect(a1: FPoint, a2: FPoint, b1: FPoint, b2: FPoint) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(a1, b1, b2))
        || (d2 == 0.0 && on_segment(a2, b1, b2))
        || (d3 == 0.0 && on_segment(b1, a1, a2))
        || (d4 == 0.0 && on_segment(b2, a1, a2))
}

/// True if the segments cross at a single interior point of both.
pub fn segments_cross(a1: FPoint, a2: FPoint, b1: FPoint, b2: FPoint) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

pub fn distance_segment_segment(a1: FPoint, a2: FPoint, b1: FPoint, b2: FPoint) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    distance_point_segment(a1, b1, b2)
        .min(distance_point_segment(a2, b1, b2))
        .min(distance_point_segment(b1, a1, a2))
        .min(distance_point_segment(b2, a1, a2))
}

/// Even-odd point-in-polygon test. The polygon may or may not repeat its
/// first vertex at the end.
pub fn point_in_polygon(p: FPoint, polygon: &[FPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_center_quarter_circle() {
        let c = arc_center(
            Point::from_nm(1_000_000, 0),
            Point::from_nm(0, 1_000_000),
            Angle::deg90(),
        )
        .unwrap();
        assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6, "{:?}", c);

        let c = arc_center(
            Point::from_nm(1_000_000, 0),
            Point::from_nm(0, 1_000_000),
            -Angle::deg90(),
        )
        .unwrap();
        assert!((c.x - 1e6).abs() < 1e-6 && (c.y - 1e6).abs() < 1e-6, "{:?}", c);
    }

    #[test]
    fn test_arc_radius() {
        let r = arc_radius(
            Point::from_nm(-500_000, 0),
            Point::from_nm(500_000, 0),
            Angle::deg180(),
        );
        assert_eq!(r, Length::new(500_000));
        assert_eq!(
            arc_radius(Point::origin(), Point::from_nm(10, 0), Angle::deg0()),
            Length::zero()
        );
    }

    #[test]
    fn test_flatten_arc_respects_tolerance() {
        let p1 = Point::from_nm(10_000_000, 0);
        let p2 = Point::from_nm(-10_000_000, 0);
        let tol = PositiveLength::new(Length::new(5_000)).unwrap();
        let points = flatten_arc(p1, p2, Angle::deg180(), tol);
        assert_eq!(*points.last().unwrap(), p2);
        assert!(points.len() > 10);
        let mut prev = FPoint::from(p1);
        for p in &points {
            let cur = FPoint::from(*p);
            let mid = FPoint::new((prev.x + cur.x) / 2.0, (prev.y + cur.y) / 2.0);
            let sagitta = 10_000_000.0 - mid.distance_to(FPoint::new(0.0, 0.0));
            assert!(sagitta <= 5_000.0 + 1.0, "sagitta {}", sagitta);
            prev = cur;
        }
    }

    #[test]
    fn test_flatten_straight_segment() {
        let tol = PositiveLength::new(Length::new(5_000)).unwrap();
        let points = flatten_arc(Point::origin(), Point::from_nm(5, 5), Angle::deg0(), tol);
        assert_eq!(points, vec![Point::from_nm(5, 5)]);
    }

    #[test]
    fn test_segment_distances() {
        let a1 = FPoint::new(0.0, 0.0);
        let a2 = FPoint::new(10.0, 0.0);
        assert_eq!(
            distance_segment_segment(a1, a2, FPoint::new(5.0, 3.0), FPoint::new(5.0, 8.0)),
            3.0
        );
        assert_eq!(
            distance_segment_segment(a1, a2, FPoint::new(5.0, -3.0), FPoint::new(5.0, 8.0)),
            0.0
        );
        assert_eq!(distance_point_segment(FPoint::new(13.0, 4.0), a1, a2), 5.0);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            FPoint::new(0.0, 0.0),
            FPoint::new(10.0, 0.0),
            FPoint::new(10.0, 10.0),
            FPoint::new(0.0, 10.0),
            FPoint::new(0.0, 0.0),
        ];
        assert!(point_in_polygon(FPoint::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(FPoint::new(15.0, 5.0), &square));
    }
}
