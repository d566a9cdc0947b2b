//! Measurement shapes used by the design rule checks.
//!
//! Every copper or keep-out object is reduced to a *core* (a point, a
//! polyline or a filled polygon) inflated by a half width. The clearance
//! between two such shapes is the distance between their cores minus both
//! half widths, which is exact for strokes, circles, obrounds and
//! rounded polygons.

use super::toolbox::{
    distance_point_segment, distance_segment_segment, point_in_polygon, segments_cross, FPoint,
};
use super::{Path, PositiveLength};

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    core: Vec<FPoint>,
    filled: bool,
    half_width: f64,
    min: FPoint,
    max: FPoint,
}

impl Shape {
    fn new(core: Vec<FPoint>, filled: bool, half_width: f64) -> Self {
        let mut min = FPoint::new(f64::INFINITY, f64::INFINITY);
        let mut max = FPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &core {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        let filled = filled && core_is_area(&core);
        Self {
            core,
            filled,
            half_width: half_width.max(0.0),
            min,
            max,
        }
    }

    /// A stroked polyline of the given total width.
    pub fn stroke(path: &Path, width: f64, tolerance: PositiveLength) -> Self {
        Self::new(path.to_fpoints(tolerance), false, width / 2.0)
    }

    /// A filled area with an optional outline stroke.
    pub fn area(path: &Path, outline_width: f64, tolerance: PositiveLength) -> Self {
        Self::new(path.to_fpoints(tolerance), true, outline_width / 2.0)
    }

    pub fn circle(center: FPoint, diameter: f64) -> Self {
        Self::new(vec![center], false, diameter / 2.0)
    }

    /// Capsule around the segment `a-b`.
    pub fn capsule(a: FPoint, b: FPoint, width: f64) -> Self {
        Self::new(vec![a, b], false, width / 2.0)
    }

    /// Filled polygon inflated by `radius` (rounded polygon).
    pub fn inflated_polygon(polygon: Vec<FPoint>, radius: f64) -> Self {
        Self::new(polygon, true, radius)
    }

    pub fn core(&self) -> &[FPoint] {
        &self.core
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    /// Same shape with the half width grown by `offset` on every side.
    pub fn offset(&self, offset: f64) -> Self {
        Self::new(self.core.clone(), self.filled, self.half_width + offset)
    }

    fn segments(&self) -> impl Iterator<Item = (FPoint, FPoint)> + '_ {
        let single = (self.core.len() == 1).then(|| (self.core[0], self.core[0]));
        single
            .into_iter()
            .chain(self.core.windows(2).map(|w| (w[0], w[1])))
            .chain(
                (self.filled && !is_closed(&self.core))
                    .then(|| (self.core[self.core.len() - 1], self.core[0])),
            )
    }

    fn bbox_distance(&self, other: &Shape) -> f64 {
        let dx = (self.min.x.max(other.min.x) - self.max.x.min(other.max.x)).max(0.0);
        let dy = (self.min.y.max(other.min.y) - self.max.y.min(other.max.y)).max(0.0);
        dx.hypot(dy) - self.half_width - other.half_width
    }

    /// Lower bound of [`Shape::clearance`], cheap to compute.
    pub fn clearance_lower_bound(&self, other: &Shape) -> f64 {
        if self.core.is_empty() || other.core.is_empty() {
            return f64::INFINITY;
        }
        self.bbox_distance(other)
    }

    fn contains_core_point_of(&self, other: &Shape) -> bool {
        self.filled
            && other
                .core
                .first()
                .is_some_and(|p| point_in_polygon(*p, &self.core))
    }

    fn core_distance(&self, other: &Shape) -> f64 {
        if self.contains_core_point_of(other) || other.contains_core_point_of(self) {
            return 0.0;
        }
        let mut best = f64::INFINITY;
        for (a1, a2) in self.segments() {
            for (b1, b2) in other.segments() {
                best = best.min(distance_segment_segment(a1, a2, b1, b2));
                if best == 0.0 {
                    return 0.0;
                }
            }
        }
        best
    }

    /// Gap between the two shapes' copper, negative when they overlap by
    /// their widths. Zero when the cores touch or cross.
    pub fn clearance(&self, other: &Shape) -> f64 {
        if self.core.is_empty() || other.core.is_empty() {
            return f64::INFINITY;
        }
        let core = self.core_distance(other);
        if core == 0.0 {
            return -(self.half_width + other.half_width);
        }
        core - self.half_width - other.half_width
    }

    /// True if the shapes share at least one point.
    pub fn overlaps(&self, other: &Shape) -> bool {
        if self.clearance_lower_bound(other) > 0.0 {
            return false;
        }
        let core = self.core_distance(other);
        core == 0.0 || core < self.half_width + other.half_width
    }

    /// True if the shapes overlap by a positive area. Shapes that merely
    /// touch along an edge or in a point do not.
    pub fn overlaps_area(&self, other: &Shape) -> bool {
        const EPSILON: f64 = 1.0;
        if self.clearance_lower_bound(other) > 0.0 {
            return false;
        }
        if self.clearance(other) < -EPSILON {
            return true;
        }
        let crossing = self.segments().any(|(a1, a2)| {
            other
                .segments()
                .any(|(b1, b2)| segments_cross(a1, a2, b1, b2))
        });
        crossing
            || self.has_point_inside(other, EPSILON)
            || other.has_point_inside(self, EPSILON)
    }

    /// True if a core vertex or the vertex centroid of `other` lies
    /// strictly inside this shape.
    fn has_point_inside(&self, other: &Shape, epsilon: f64) -> bool {
        if other.core.is_empty() {
            return false;
        }
        let n = other.core.len() as f64;
        let centroid = FPoint::new(
            other.core.iter().map(|p| p.x).sum::<f64>() / n,
            other.core.iter().map(|p| p.y).sum::<f64>() / n,
        );
        std::iter::once(centroid)
            .chain(other.core.iter().copied())
            .any(|p| self.inner_clearance(p) > epsilon)
    }

    pub fn contains(&self, p: FPoint) -> bool {
        self.inner_clearance(p) > 0.0
    }

    /// Distance from `p` to the shape's border, positive inside.
    pub fn inner_clearance(&self, p: FPoint) -> f64 {
        let edge = self
            .segments()
            .map(|(a, b)| distance_point_segment(p, a, b))
            .fold(f64::INFINITY, f64::min);
        if self.filled && point_in_polygon(p, &self.core) {
            edge + self.half_width
        } else {
            self.half_width - edge
        }
    }
}

fn is_closed(points: &[FPoint]) -> bool {
    points.len() > 2 && points.first() == points.last()
}

fn core_is_area(points: &[FPoint]) -> bool {
    let distinct = if is_closed(points) {
        points.len() - 1
    } else {
        points.len()
    };
    distinct >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Length, Point};

    fn tol() -> PositiveLength {
        PositiveLength::new(Length::new(5_000)).unwrap()
    }

    fn square(x0: i64, y0: i64, size: i64) -> Path {
        Path::polygon(&[
            Point::from_nm(x0, y0),
            Point::from_nm(x0 + size, y0),
            Point::from_nm(x0 + size, y0 + size),
            Point::from_nm(x0, y0 + size),
        ])
    }

    #[test]
    fn test_circle_clearance() {
        let a = Shape::circle(FPoint::new(0.0, 0.0), 1_000.0);
        let b = Shape::circle(FPoint::new(3_000.0, 0.0), 1_000.0);
        assert_eq!(a.clearance(&b), 2_000.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_stroke_inside_area_has_no_clearance() {
        let area = Shape::area(&square(0, 0, 10_000), 0.0, tol());
        let trace = Shape::capsule(FPoint::new(2_000.0, 5_000.0), FPoint::new(8_000.0, 5_000.0), 500.0);
        assert!(area.clearance(&trace) < 0.0);
        assert!(area.overlaps(&trace));
    }

    #[test]
    fn test_area_to_area_clearance() {
        let a = Shape::area(&square(0, 0, 1_000), 0.0, tol());
        let b = Shape::area(&square(1_500, 0, 1_000), 0.0, tol());
        assert_eq!(a.clearance(&b), 500.0);
        assert!(!a.overlaps(&b));
        let touching = Shape::area(&square(1_000, 0, 1_000), 0.0, tol());
        assert!(a.overlaps(&touching));
    }

    #[test]
    fn test_offset_grows_shape() {
        let a = Shape::area(&square(0, 0, 1_000), 0.0, tol()).offset(300.0);
        let b = Shape::area(&square(1_500, 0, 1_000), 0.0, tol()).offset(300.0);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_overlaps_area() {
        let a = Shape::area(&square(0, 0, 1_000), 0.0, tol());
        let touching = Shape::area(&square(1_000, 0, 1_000), 0.0, tol());
        assert!(!a.overlaps_area(&touching));
        assert!(a.overlaps_area(&Shape::area(&square(0, 0, 1_000), 0.0, tol())));
        assert!(a.overlaps_area(&Shape::area(&square(200, 200, 100), 0.0, tol())));
        assert!(a.overlaps_area(&touching.offset(10.0)));
        // plus sign: no vertex of either rectangle lies inside the other
        let wide = Shape::area(
            &Path::polygon(&[
                Point::from_nm(-3_000, -1_000),
                Point::from_nm(3_000, -1_000),
                Point::from_nm(3_000, 1_000),
                Point::from_nm(-3_000, 1_000),
            ]),
            0.0,
            tol(),
        );
        let tall = Shape::area(
            &Path::polygon(&[
                Point::from_nm(-1_000, -3_000),
                Point::from_nm(1_000, -3_000),
                Point::from_nm(1_000, 3_000),
                Point::from_nm(-1_000, 3_000),
            ]),
            0.0,
            tol(),
        );
        assert!(wide.overlaps_area(&tall));
    }

    #[test]
    fn test_inner_clearance() {
        let pad = Shape::circle(FPoint::new(0.0, 0.0), 1_000.0);
        assert_eq!(pad.inner_clearance(FPoint::new(100.0, 0.0)), 400.0);
        let rect = Shape::area(&square(-500, -500, 1_000), 0.0, tol());
        assert_eq!(rect.inner_clearance(FPoint::new(200.0, 0.0)), 300.0);
        assert!(rect.inner_clearance(FPoint::new(800.0, 0.0)) < 0.0);
    }
}
