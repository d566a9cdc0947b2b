//! Board items reduced to measurement shapes.

use uuid::Uuid;

use super::message::ItemRef;
use super::DrcError;
use crate::board::{Board, Device, Layer, Pad};
use crate::geometry::{Path, Point, PositiveLength, Shape};

/// Maximum deviation when arcs are flattened for measurement.
pub const ARC_TOLERANCE: PositiveLength = PositiveLength::new_const(5_000);

/// A piece of copper, identical on all of its layers.
#[derive(Debug, Clone)]
pub struct CopperItem {
    pub item: ItemRef,
    pub net: Option<Uuid>,
    pub layers: Vec<Layer>,
    pub shape: Shape,
    /// Human readable name used in messages.
    pub label: String,
    /// Outline for highlighting.
    pub outline: Path,
}

impl CopperItem {
    pub fn is_on(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }

    pub fn shares_layer_with(&self, other: &CopperItem) -> bool {
        self.layers.iter().any(|l| other.is_on(*l))
    }

    /// True if both items are known to be on the same net.
    pub fn same_net(&self, other: &CopperItem) -> bool {
        self.net.is_some() && self.net == other.net
    }
}

/// A drilled hole or slot in board coordinates.
#[derive(Debug, Clone)]
pub struct HoleItem {
    pub item: ItemRef,
    pub plated: bool,
    pub diameter: PositiveLength,
    pub path: Path,
    pub shape: Shape,
    pub label: String,
}

impl HoleItem {
    fn new(
        item: ItemRef,
        plated: bool,
        diameter: PositiveLength,
        path: Path,
        label: String,
    ) -> Result<Self, DrcError> {
        if path.is_empty() {
            return Err(DrcError::InvalidBoard(format!(
                "drill {} has no position",
                item.to_sexpr()
            )));
        }
        let shape = Shape::stroke(&path, diameter.get().to_nm() as f64, ARC_TOLERANCE);
        Ok(Self {
            item,
            plated,
            diameter,
            path,
            shape,
            label,
        })
    }

    pub fn is_slot(&self) -> bool {
        self.path.len() > 1
    }

    /// Outline for highlighting: a circle for drills, the center line for slots.
    pub fn outline(&self) -> Path {
        match self.path.vertices() {
            [drill] => circle_at(drill.pos, self.diameter),
            _ => self.path.clone(),
        }
    }
}

pub fn circle_at(center: Point, diameter: PositiveLength) -> Path {
    Path::circle(diameter).translated(center)
}

pub fn pad_label(device: &Device, pad: &Pad) -> String {
    format!("pad {}.{}", device.name, pad.name)
}

/// Pad outline in board coordinates.
pub fn pad_outline(device: &Device, pad: &Pad) -> Path {
    device.pad_transform(pad).map_path(&pad.outline())
}

pub fn pad_shape(device: &Device, pad: &Pad) -> Shape {
    Shape::area(&pad_outline(device, pad), 0.0, ARC_TOLERANCE)
}

/// Collect every copper object of the board.
pub fn copper_items(board: &Board) -> Result<Vec<CopperItem>, DrcError> {
    let all_layers = board.copper_layers();
    let mut items = Vec::new();

    for trace in &board.traces {
        let outline = Path::line(trace.start, trace.end);
        items.push(CopperItem {
            item: ItemRef::Trace { trace: trace.uuid },
            net: trace.net,
            layers: vec![trace.layer],
            shape: Shape::stroke(&outline, trace.width.get().to_nm() as f64, ARC_TOLERANCE),
            label: format!("trace on {}", trace.layer),
            outline,
        });
    }

    for via in &board.vias {
        let layers = board.copper_layers_between(via.start_layer, via.end_layer);
        if layers.is_empty() {
            return Err(DrcError::InvalidBoard(format!(
                "via {} spans no copper layer",
                via.uuid
            )));
        }
        items.push(CopperItem {
            item: ItemRef::Via { via: via.uuid },
            net: via.net,
            layers,
            shape: Shape::circle(via.position.into(), via.size.get().to_nm() as f64),
            label: "via".to_string(),
            outline: circle_at(via.position, via.size),
        });
    }

    for device in &board.devices {
        for pad in &device.pads {
            let outline = pad_outline(device, pad);
            items.push(CopperItem {
                item: ItemRef::Pad {
                    device: device.uuid,
                    pad: pad.uuid,
                },
                net: pad.net,
                layers: pad.copper_layers(device.side(), &all_layers),
                shape: Shape::area(&outline, 0.0, ARC_TOLERANCE),
                label: pad_label(device, pad),
                outline,
            });
        }
    }

    for plane in &board.planes {
        for fragment in &plane.fragments {
            items.push(CopperItem {
                item: ItemRef::Plane { plane: plane.uuid },
                net: Some(plane.net),
                layers: vec![plane.layer],
                shape: Shape::area(fragment, 0.0, ARC_TOLERANCE),
                label: format!("plane on {}", plane.layer),
                outline: fragment.clone(),
            });
        }
    }

    for polygon in &board.polygons {
        let width = polygon.line_width.get().to_nm() as f64;
        let shape = if polygon.is_area() {
            Shape::area(&polygon.path, width, ARC_TOLERANCE)
        } else {
            Shape::stroke(&polygon.path, width, ARC_TOLERANCE)
        };
        items.push(CopperItem {
            item: ItemRef::Polygon {
                polygon: polygon.uuid,
            },
            net: polygon.net,
            layers: vec![polygon.layer],
            shape,
            label: format!("polygon on {}", polygon.layer),
            outline: polygon.path.clone(),
        });
    }

    Ok(items)
}

/// Collect every plated and non-plated hole of the board.
pub fn hole_items(board: &Board) -> Result<Vec<HoleItem>, DrcError> {
    let mut holes = Vec::new();

    for via in &board.vias {
        holes.push(HoleItem::new(
            ItemRef::Via { via: via.uuid },
            true,
            via.drill,
            Path::point(via.position),
            "via".to_string(),
        )?);
    }

    for device in &board.devices {
        for pad in &device.pads {
            let transform = device.pad_transform(pad);
            for hole in pad.holes() {
                holes.push(HoleItem::new(
                    ItemRef::PadHole {
                        device: device.uuid,
                        pad: pad.uuid,
                        hole: hole.uuid,
                    },
                    true,
                    hole.diameter,
                    transform.map_path(&hole.path),
                    pad_label(device, pad),
                )?);
            }
        }
        let transform = device.transform();
        for hole in &device.holes {
            holes.push(HoleItem::new(
                ItemRef::DeviceHole {
                    device: device.uuid,
                    hole: hole.uuid,
                },
                false,
                hole.diameter,
                transform.map_path(&hole.path),
                format!("hole of {}", device.name),
            )?);
        }
    }

    for hole in &board.holes {
        holes.push(HoleItem::new(
            ItemRef::Hole { hole: hole.uuid },
            false,
            hole.diameter,
            hole.path.clone(),
            "hole".to_string(),
        )?);
    }

    Ok(holes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Trace, Via};
    use crate::geometry::{Angle, Length};

    #[test]
    fn test_collects_all_copper() {
        let mut board = Board::new("test");
        board.inner_copper_layers = 2;
        board.traces.push(Trace {
            uuid: Uuid::new_v4(),
            net: None,
            layer: Layer::InnerCopper(1),
            start: Point::origin(),
            end: Point::from_mm(1.0, 0.0),
            width: PositiveLength::from_mm(0.2).unwrap(),
            start_anchor: None,
            end_anchor: None,
        });
        board.vias.push(Via {
            uuid: Uuid::new_v4(),
            net: None,
            position: Point::from_mm(5.0, 5.0),
            size: PositiveLength::from_mm(0.6).unwrap(),
            drill: PositiveLength::from_mm(0.3).unwrap(),
            start_layer: Layer::TopCopper,
            end_layer: Layer::InnerCopper(1),
            exposed: false,
        });
        let mut device = Device {
            uuid: Uuid::new_v4(),
            name: "J1".to_string(),
            value: String::new(),
            device_name: String::new(),
            package_name: String::new(),
            position: Point::from_mm(10.0, 0.0),
            rotation: Angle::deg90(),
            mirrored: false,
            assembly_type: Default::default(),
            pads: vec![],
            holes: vec![],
            courtyard: vec![],
        };
        device.pads.push(
            Pad::tht("1", Point::from_mm(1.0, 0.0), Length::from_mm(1.6), Length::from_mm(0.8))
                .unwrap(),
        );
        board.devices.push(device);

        let items = copper_items(&board).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].layers, vec![Layer::TopCopper, Layer::InnerCopper(1)]);
        assert_eq!(items[2].layers.len(), 4);

        let holes = hole_items(&board).unwrap();
        assert_eq!(holes.len(), 2);
        // pad at (1, 0) rotated by 90° around the device origin
        assert_eq!(holes[1].path.vertices()[0].pos, Point::from_mm(10.0, 1.0));
        assert!(holes.iter().all(|h| h.plated && !h.is_slot()));
    }
}
