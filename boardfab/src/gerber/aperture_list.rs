//! Gerber aperture list
//!
//! Collects the apertures used by one Gerber file and renders their
//! definitions. Requests are canonicalized first, so equivalent shapes share
//! a single D code.
//!
//! Native apertures (`C`, `O`, `R`) are used whenever the shape is axis
//! aligned. Everything else becomes an aperture macro restricted to a small
//! subset that every CAM tool we know of renders correctly:
//!
//! - only circle (1, never rotated), outline (4) and vector line (20)
//!   primitives
//! - only literal numbers, no variables or arithmetic
//! - rotation baked into the coordinates, primitive rotation always 0
//!
//! The polygon aperture is only used for the component pin 1 marker, where
//! Gerber X3 mandates it.

use std::collections::HashMap;

use super::attribute::{ApertureFunction, Attribute, AttributeStyle};
use crate::geometry::{Angle, FPoint, Length, Path, Point, PositiveLength, UnsignedLength};

/// D code of the first aperture. Lower codes are reserved.
pub const FIRST_APERTURE_ID: u32 = 10;

/// Maximum deviation of flattened arcs inside macros.
const ARC_TOLERANCE: PositiveLength = PositiveLength::new_const(5_000);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Template {
    /// Standard aperture, e.g. `C,0.5`.
    Standard(String),
    /// Macro named `<prefix><id>` made of the given primitives.
    Macro {
        prefix: &'static str,
        primitives: Vec<String>,
    },
}

impl Template {
    fn name(&self, id: u32) -> String {
        match self {
            Template::Standard(text) => text.clone(),
            Template::Macro { prefix, .. } => format!("{}{}", prefix, id),
        }
    }
}

#[derive(Debug, Clone)]
struct Aperture {
    id: u32,
    template: Template,
    function: Option<ApertureFunction>,
}

/// Aperture definitions of a single Gerber file.
#[derive(Debug, Clone, Default)]
pub struct ApertureList {
    style: AttributeStyle,
    apertures: Vec<Aperture>,
    index: HashMap<(Template, Option<ApertureFunction>), u32>,
}

impl ApertureList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute_style(style: AttributeStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }

    /// Circle aperture. A diameter of zero is valid.
    pub fn add_circle(
        &mut self,
        diameter: UnsignedLength,
        function: Option<ApertureFunction>,
    ) -> u32 {
        let template = Template::Standard(format!("C,{}", mm(diameter.get())));
        self.add(template, function)
    }

    pub fn add_obround(
        &mut self,
        width: PositiveLength,
        height: PositiveLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
    ) -> u32 {
        if width == height {
            return self.add_circle(width.to_unsigned(), function);
        }
        let (w, h, rotation) = canonical_orientation(width.get(), height.get(), rotation);
        if rotation.is_zero() {
            let template = Template::Standard(format!("O,{}X{}", mm(w), mm(h)));
            return self.add(template, function);
        }
        let diameter = w.min(h);
        let offset = (w.max(h) - diameter).to_nm() as f64 / 2.0;
        let (p1, p2) = if w > h {
            (rotated(-offset, 0.0, rotation), rotated(offset, 0.0, rotation))
        } else {
            (rotated(0.0, -offset, rotation), rotated(0.0, offset, rotation))
        };
        let primitives = vec![
            circle_primitive(diameter, p1),
            circle_primitive(diameter, p2),
            line_primitive(diameter, p1, p2),
        ];
        self.add(
            Template::Macro {
                prefix: "ROTATEDOBROUND",
                primitives,
            },
            function,
        )
    }

    /// Rectangle with optionally rounded corners. A corner radius of at
    /// least half the shorter side yields an obround.
    pub fn add_rect(
        &mut self,
        width: PositiveLength,
        height: PositiveLength,
        corner_radius: UnsignedLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
    ) -> u32 {
        let radius = corner_radius.get();
        if radius * 2 >= width.get().min(height.get()) {
            return self.add_obround(width, height, rotation, function);
        }
        let (w, h, rotation) = canonical_orientation(width.get(), height.get(), rotation);
        let (rx, ry) = (w.to_nm() as f64 / 2.0, h.to_nm() as f64 / 2.0);
        if radius.to_nm() == 0 {
            if rotation.is_zero() {
                let template = Template::Standard(format!("R,{}X{}", mm(w), mm(h)));
                return self.add(template, function);
            }
            let corners = [(-rx, -ry), (rx, -ry), (rx, ry), (-rx, ry), (-rx, -ry)];
            let points: Vec<Point> = corners
                .iter()
                .map(|&(x, y)| rotated(x, y, rotation))
                .collect();
            return self.add(
                Template::Macro {
                    prefix: "ROTATEDRECT",
                    primitives: vec![outline_primitive(&points)],
                },
                function,
            );
        }
        // Four corner circles plus a horizontal and a vertical bar.
        let r = radius.to_nm() as f64;
        let (cx, cy) = (rx - r, ry - r);
        let mut primitives: Vec<String> = [(cx, cy), (-cx, cy), (-cx, -cy), (cx, -cy)]
            .iter()
            .map(|&(x, y)| circle_primitive(radius * 2, rotated(x, y, rotation)))
            .collect();
        primitives.push(line_primitive(
            h,
            rotated(-cx, 0.0, rotation),
            rotated(cx, 0.0, rotation),
        ));
        primitives.push(line_primitive(
            w,
            rotated(0.0, -cy, rotation),
            rotated(0.0, cy, rotation),
        ));
        self.add(
            Template::Macro {
                prefix: "ROUNDEDRECT",
                primitives,
            },
            function,
        )
    }

    /// Octagon with 45° chamfers and optionally rounded corners.
    pub fn add_octagon(
        &mut self,
        width: PositiveLength,
        height: PositiveLength,
        corner_radius: UnsignedLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
    ) -> u32 {
        let (w, h, rotation) = if width == height {
            (width, height, rotation.mapped_to_period(Angle::deg45()))
        } else {
            canonical_orientation(width, height, rotation)
        };
        let outline = Path::octagon(w, h, corner_radius).flattened_arcs(ARC_TOLERANCE);
        let points: Vec<Point> = outline
            .vertices()
            .iter()
            .map(|v| v.pos.rotated(rotation, Point::origin()))
            .collect();
        self.add(
            Template::Macro {
                prefix: "OCTAGON",
                primitives: vec![outline_primitive(&points)],
            },
            function,
        )
    }

    /// Component center marker of Gerber X3 component layers.
    pub fn add_component_main(&mut self) -> u32 {
        self.add(
            Template::Standard("C,0.3".to_string()),
            Some(ApertureFunction::ComponentMain),
        )
    }

    /// Component pin marker of Gerber X3 component layers: a diamond for
    /// pin 1, a zero sized circle for all other pins.
    pub fn add_component_pin(&mut self, pin1: bool) -> u32 {
        let text = if pin1 { "P,0.36X4X0.0" } else { "C,0" };
        self.add(
            Template::Standard(text.to_string()),
            Some(ApertureFunction::ComponentPin),
        )
    }

    /// Render all macro and aperture definitions in creation order.
    pub fn generate_string(&self) -> String {
        let mut out = String::new();
        let mut current: Option<ApertureFunction> = None;
        for aperture in &self.apertures {
            if let Template::Macro { prefix, primitives } = &aperture.template {
                out.push_str(&format!("%AM{}{}*\n", prefix, aperture.id));
                for primitive in primitives {
                    out.push_str(primitive);
                    out.push_str("*\n");
                }
                out.push_str("%\n");
            }
            if aperture.function != current {
                let attribute = match aperture.function {
                    Some(function) => Attribute::ApertureFunction(function),
                    None => Attribute::Delete,
                };
                out.push_str(&attribute.to_gerber_string(self.style));
                current = aperture.function;
            }
            out.push_str(&format!(
                "%ADD{}{}*%\n",
                aperture.id,
                aperture.template.name(aperture.id)
            ));
        }
        if current.is_some() {
            out.push_str(&Attribute::Delete.to_gerber_string(self.style));
        }
        out
    }

    fn add(&mut self, template: Template, function: Option<ApertureFunction>) -> u32 {
        let key = (template, function);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = FIRST_APERTURE_ID + self.apertures.len() as u32;
        tracing::trace!("new aperture D{}: {:?}", id, key.0);
        self.apertures.push(Aperture {
            id,
            template: key.0.clone(),
            function,
        });
        self.index.insert(key, id);
        id
    }
}

/// Fold a shape with 180° symmetry onto a rotation in `[0°, 90°)`,
/// swapping width and height for the upright half.
fn canonical_orientation<T>(width: T, height: T, rotation: Angle) -> (T, T, Angle) {
    let rotation = rotation.mapped_to_period(Angle::deg180());
    if rotation >= Angle::deg90() {
        (height, width, rotation - Angle::deg90())
    } else {
        (width, height, rotation)
    }
}

fn mm(length: Length) -> String {
    length.to_mm_string()
}

fn rotated(x: f64, y: f64, rotation: Angle) -> Point {
    let (sin, cos) = rotation.to_rad().sin_cos();
    FPoint::new(x * cos - y * sin, x * sin + y * cos).to_point()
}

fn circle_primitive(diameter: Length, center: Point) -> String {
    format!("1,1,{},{},{}", mm(diameter), mm(center.x), mm(center.y))
}

fn line_primitive(width: Length, start: Point, end: Point) -> String {
    format!(
        "20,1,{},{},{},{},{},0",
        mm(width),
        mm(start.x),
        mm(start.y),
        mm(end.x),
        mm(end.y)
    )
}

/// `points` must be closed (last equals first).
fn outline_primitive(points: &[Point]) -> String {
    let mut s = format!("4,1,{}", points.len().saturating_sub(1));
    for p in points {
        s.push_str(&format!(",{},{}", mm(p.x), mm(p.y)));
    }
    s.push_str(",0");
    s
}
