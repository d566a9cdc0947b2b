use serde::{Deserialize, Serialize};

use super::toolbox::{flatten_arc, FPoint};
use super::{Angle, Length, Point, PositiveLength, UnsignedLength};

/// A path vertex. `angle` is the sweep of the segment *leaving* this vertex;
/// zero means a straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point,
    #[serde(default)]
    pub angle: Angle,
}

impl Vertex {
    pub const fn new(pos: Point, angle: Angle) -> Self {
        Self { pos, angle }
    }

    pub const fn straight(pos: Point) -> Self {
        Self {
            pos,
            angle: Angle::deg0(),
        }
    }
}

/// An ordered list of vertices forming a polyline with optional arcs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    vertices: Vec<Vertex>,
}

impl Path {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn point(p: Point) -> Self {
        Self::new(vec![Vertex::straight(p)])
    }

    pub fn line(p1: Point, p2: Point) -> Self {
        Self::new(vec![Vertex::straight(p1), Vertex::straight(p2)])
    }

    /// Closed polygon through `points`; the first point is repeated at the end.
    pub fn polygon(points: &[Point]) -> Self {
        let mut path = Self::new(points.iter().copied().map(Vertex::straight).collect());
        path.close();
        path
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    pub fn add_vertex(&mut self, pos: Point, angle: Angle) {
        self.vertices.push(Vertex::new(pos, angle));
    }

    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => self.vertices.len() > 2 && first.pos == last.pos,
            _ => false,
        }
    }

    /// Append the first vertex if the path is not closed yet.
    pub fn close(&mut self) {
        if let Some(first) = self.vertices.first().copied() {
            if self.vertices.len() > 1 && !self.is_closed() {
                self.vertices.push(Vertex::straight(first.pos));
            }
        }
    }

    /// True if any segment is an arc. The last vertex's angle is ignored.
    pub fn is_curved(&self) -> bool {
        self.segments().any(|(v, _)| !v.angle.is_zero())
    }

    /// Iterate `(from, to)` vertex pairs.
    pub fn segments(&self) -> impl Iterator<Item = (&Vertex, &Vertex)> {
        self.vertices.windows(2).map(|w| (&w[0], &w[1]))
    }

    pub fn translated(&self, offset: Point) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|v| Vertex::new(v.pos + offset, v.angle))
                .collect(),
        )
    }

    pub fn rotated(&self, angle: Angle, center: Point) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|v| Vertex::new(v.pos.rotated(angle, center), v.angle))
                .collect(),
        )
    }

    /// Mirror at the vertical axis through `center`; arc directions flip.
    pub fn mirrored_horizontally(&self, center: Length) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|v| Vertex::new(v.pos.mirrored_horizontally(center), -v.angle))
                .collect(),
        )
    }

    /// Replace every arc by straight segments deviating at most `tolerance`.
    pub fn flattened_arcs(&self, tolerance: PositiveLength) -> Self {
        let mut out = Vec::with_capacity(self.vertices.len());
        if let Some(first) = self.vertices.first() {
            out.push(Vertex::straight(first.pos));
        }
        for (from, to) in self.segments() {
            for p in flatten_arc(from.pos, to.pos, from.angle, tolerance) {
                out.push(Vertex::straight(p));
            }
        }
        Self::new(out)
    }

    /// Flattened vertex positions as floating point coordinates.
    pub fn to_fpoints(&self, tolerance: PositiveLength) -> Vec<FPoint> {
        self.flattened_arcs(tolerance)
            .vertices
            .iter()
            .map(|v| FPoint::from(v.pos))
            .collect()
    }

    /// Closed circle centered at the origin, built from two half arcs.
    pub fn circle(diameter: PositiveLength) -> Self {
        let r = diameter.get() / 2;
        Self::new(vec![
            Vertex::new(Point::new(r, Length::zero()), Angle::deg180()),
            Vertex::new(Point::new(-r, Length::zero()), Angle::deg180()),
            Vertex::straight(Point::new(r, Length::zero())),
        ])
    }

    /// Closed obround centered at the origin. Degrades to a circle if
    /// `width == height`.
    pub fn obround(width: PositiveLength, height: PositiveLength) -> Self {
        let (w, h) = (width.get(), height.get());
        if w == h {
            return Self::circle(width);
        }
        let mut path = Self::default();
        if w > h {
            let (rx, r) = ((w - h) / 2, h / 2);
            path.add_vertex(Point::new(-rx, -r), Angle::deg0());
            path.add_vertex(Point::new(rx, -r), Angle::deg180());
            path.add_vertex(Point::new(rx, r), Angle::deg0());
            path.add_vertex(Point::new(-rx, r), Angle::deg180());
            path.add_vertex(Point::new(-rx, -r), Angle::deg0());
        } else {
            let (ry, r) = ((h - w) / 2, w / 2);
            path.add_vertex(Point::new(r, -ry), Angle::deg0());
            path.add_vertex(Point::new(r, ry), Angle::deg180());
            path.add_vertex(Point::new(-r, ry), Angle::deg0());
            path.add_vertex(Point::new(-r, -ry), Angle::deg180());
            path.add_vertex(Point::new(r, -ry), Angle::deg0());
        }
        path
    }

    /// Closed rectangle centered at the origin with rounded corners.
    pub fn centered_rect(width: PositiveLength, height: PositiveLength, radius: UnsignedLength) -> Self {
        let (rx, ry) = (width.get() / 2, height.get() / 2);
        let corners = [
            Point::new(rx, -ry),
            Point::new(rx, ry),
            Point::new(-rx, ry),
            Point::new(-rx, -ry),
        ];
        Self::rounded_polygon(&corners, radius.get())
    }

    /// Closed octagon centered at the origin with 45° chamfers and
    /// optionally rounded corners.
    pub fn octagon(width: PositiveLength, height: PositiveLength, radius: UnsignedLength) -> Self {
        let (rx, ry) = (width.get() / 2, height.get() / 2);
        let chamfer = Length::new(
            (rx.min(ry).to_nm() as f64 * (2.0 - std::f64::consts::SQRT_2)).round() as i64,
        );
        let corners = [
            Point::new(rx, -ry + chamfer),
            Point::new(rx, ry - chamfer),
            Point::new(rx - chamfer, ry),
            Point::new(-rx + chamfer, ry),
            Point::new(-rx, ry - chamfer),
            Point::new(-rx, -ry + chamfer),
            Point::new(-rx + chamfer, -ry),
            Point::new(rx - chamfer, -ry),
        ];
        Self::rounded_polygon(&corners, radius.get())
    }

    /// Closed convex polygon (counter-clockwise corners) with every corner
    /// replaced by a tangent arc of `radius`. The radius is clamped so that
    /// neighbouring arcs never overlap.
    pub fn rounded_polygon(corners: &[Point], radius: Length) -> Self {
        let n = corners.len();
        if radius <= Length::zero() || n < 3 {
            return Self::polygon(corners);
        }
        let f: Vec<FPoint> = corners.iter().copied().map(FPoint::from).collect();
        let turns: Vec<f64> = (0..n)
            .map(|i| {
                let prev = f[(i + n - 1) % n];
                let next = f[(i + 1) % n];
                let (ax, ay) = (f[i].x - prev.x, f[i].y - prev.y);
                let (bx, by) = (next.x - f[i].x, next.y - f[i].y);
                (ax * by - ay * bx).atan2(ax * bx + ay * by)
            })
            .collect();
        // Largest radius whose tangent points stay within half of every edge.
        let mut max_radius = f64::INFINITY;
        for i in 0..n {
            let edge = f[i].distance_to(f[(i + 1) % n]);
            for k in [i, (i + 1) % n] {
                let tan = (turns[k] / 2.0).tan();
                if tan > 0.0 {
                    max_radius = max_radius.min(edge / 2.0 / tan);
                }
            }
        }
        let r = (radius.to_nm() as f64).min(max_radius);
        let mut path = Self::default();
        for i in 0..n {
            let prev = f[(i + n - 1) % n];
            let next = f[(i + 1) % n];
            let t = r * (turns[i] / 2.0).tan();
            let din = unit(prev, f[i]);
            let dout = unit(f[i], next);
            let start = FPoint::new(f[i].x - din.0 * t, f[i].y - din.1 * t).to_point();
            let end = FPoint::new(f[i].x + dout.0 * t, f[i].y + dout.1 * t).to_point();
            path.add_vertex(start, Angle::from_rad(turns[i]));
            path.add_vertex(end, Angle::deg0());
        }
        path.close();
        path
    }
}

fn unit(a: FPoint, b: FPoint) -> (f64, f64) {
    let d = a.distance_to(b);
    if d == 0.0 {
        (0.0, 0.0)
    } else {
        ((b.x - a.x) / d, (b.y - a.y) / d)
    }
}
