use std::sync::Arc;

use super::connectivity::MissingConnectionRule;
use super::items::{
    circle_at, pad_label, pad_outline, pad_shape, CopperItem, HoleItem, ARC_TOLERANCE,
};
use super::message::{ApprovalKey, ItemRef, RuleCheckMessage, Severity};
use super::{DrcError, DrcOptions, MessageSink, RuleContext};
use crate::board::{Anchor, BoardSide, Device, Trace};
use crate::geometry::{Length, Path, Point, Shape, UnsignedLength};

/// Measurements are made in floating point; differences below one
/// nanometer are not violations.
const TOLERANCE: f64 = 1.0;

/// One category of design rule checks.
pub trait Rule: Send + Sync {
    /// Identifier used in approval keys and reports.
    fn id(&self) -> &'static str;

    /// Status text shown while the rule runs.
    fn name(&self) -> &str;

    fn enabled(&self, options: &DrcOptions) -> bool;

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError>;
}

/// The ordered rule catalogue of a check run.
pub struct RulesEngine {
    rules: Vec<Arc<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Arc::new(CopperWidthRule));
        engine.add_rule(Arc::new(CopperClearanceRule));
        engine.add_rule(Arc::new(CopperBoardClearanceRule));
        engine.add_rule(Arc::new(CopperNpthClearanceRule));
        engine.add_rule(Arc::new(PthRestringRule));
        engine.add_rule(Arc::new(DrillDiameterRule { plated: true }));
        engine.add_rule(Arc::new(DrillDiameterRule { plated: false }));
        engine.add_rule(Arc::new(SlotWidthRule { plated: true }));
        engine.add_rule(Arc::new(SlotWidthRule { plated: false }));
        engine.add_rule(Arc::new(SlotWarningRule { plated: true }));
        engine.add_rule(Arc::new(SlotWarningRule { plated: false }));
        engine.add_rule(Arc::new(CourtyardOverlapRule));
        engine.add_rule(Arc::new(BrokenPadConnectionRule));
        engine.add_rule(Arc::new(MissingConnectionRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Formats a floating point measurement in nanometers, e.g. `0.15mm`.
pub(crate) fn format_nm(nm: f64) -> String {
    Length::new(nm.max(0.0).round() as i64).to_string()
}

fn nm(length: UnsignedLength) -> f64 {
    length.get().to_nm() as f64
}

fn hole_kind(plated: bool) -> &'static str {
    if plated {
        "PTH"
    } else {
        "NPTH"
    }
}

pub struct CopperWidthRule;

impl Rule for CopperWidthRule {
    fn id(&self) -> &'static str {
        "copper_width"
    }

    fn name(&self) -> &str {
        "Checking copper widths..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_copper_width
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let min = ctx.options.min_copper_width.get();
        let description = "Thin copper may be etched away or break during fabrication.";

        for trace in &ctx.board.traces {
            let width = trace.width.get();
            if width < min {
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!("Min. copper width of trace on {} ({} < {})", trace.layer, width, min),
                    description,
                    ApprovalKey::new(self.id()).item(ItemRef::Trace { trace: trace.uuid }),
                    vec![Path::line(trace.start, trace.end)],
                ));
            }
        }

        for polygon in ctx.board.polygons.iter().filter(|p| !p.is_area()) {
            let width = polygon.line_width.get();
            if width > Length::zero() && width < min {
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!("Min. copper width of polygon on {} ({} < {})", polygon.layer, width, min),
                    description,
                    ApprovalKey::new(self.id()).item(ItemRef::Polygon {
                        polygon: polygon.uuid,
                    }),
                    vec![polygon.path.clone()],
                ));
            }
        }

        for plane in &ctx.board.planes {
            let width = plane.min_width.get();
            if width < min {
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!("Min. width of plane on {} ({} < {})", plane.layer, width, min),
                    "The plane may be filled with copper thinner than the fabricator can produce.",
                    ApprovalKey::new(self.id()).item(ItemRef::Plane { plane: plane.uuid }),
                    vec![plane.outline.clone()],
                ));
            }
        }
        Ok(())
    }
}

/// Two items without a net that touch are treated as connected.
fn electrically_joined(a: &CopperItem, b: &CopperItem) -> bool {
    if a.same_net(b) {
        return true;
    }
    a.net.is_none() && b.net.is_none() && a.shape.overlaps(&b.shape)
}

pub struct CopperClearanceRule;

impl Rule for CopperClearanceRule {
    fn id(&self) -> &'static str {
        "copper_clearance"
    }

    fn name(&self) -> &str {
        "Checking copper clearances..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_copper_copper_clearance
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let min = nm(ctx.options.min_copper_copper_clearance);
        let copper = &ctx.copper;

        for (i, a) in copper.iter().enumerate() {
            for b in &copper[i + 1..] {
                if a.item == b.item || !a.shares_layer_with(b) {
                    continue;
                }
                if a.shape.clearance_lower_bound(&b.shape) >= min {
                    continue;
                }
                if electrically_joined(a, b) {
                    continue;
                }
                let clearance = a.shape.clearance(&b.shape);
                if clearance >= min - TOLERANCE {
                    continue;
                }
                for layer in a.layers.iter().filter(|l| b.is_on(**l)) {
                    sink.emit(RuleCheckMessage::new(
                        Severity::Error,
                        format!(
                            "Clearance {} to {} on {} ({} < {})",
                            a.label,
                            b.label,
                            layer,
                            format_nm(clearance),
                            format_nm(min)
                        ),
                        "Copper objects of different nets are closer than the minimum clearance.",
                        ApprovalKey::new(self.id())
                            .item(a.item)
                            .item(b.item)
                            .layer(*layer),
                        vec![a.outline.clone(), b.outline.clone()],
                    ));
                }
            }
        }
        Ok(())
    }
}

pub struct CopperBoardClearanceRule;

impl Rule for CopperBoardClearanceRule {
    fn id(&self) -> &'static str {
        "copper_board_clearance"
    }

    fn name(&self) -> &str {
        "Checking copper clearance to board outline..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_copper_board_clearance
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        if ctx.board.outlines.is_empty() {
            sink.emit(RuleCheckMessage::new(
                Severity::Warning,
                "Missing board outline",
                "The board has no outline, clearances to the board edge cannot be checked.",
                ApprovalKey::new("missing_board_outline"),
                vec![],
            ));
            return Ok(());
        }

        let min = nm(ctx.options.min_copper_board_clearance);
        let outlines: Vec<Shape> = ctx
            .board
            .outlines
            .iter()
            .map(|o| Shape::stroke(o, 0.0, ARC_TOLERANCE))
            .collect();

        for item in &ctx.copper {
            let clearance = outlines
                .iter()
                .filter(|o| o.clearance_lower_bound(&item.shape) < min)
                .map(|o| o.clearance(&item.shape))
                .fold(f64::INFINITY, f64::min);
            if clearance < min - TOLERANCE {
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!(
                        "Clearance {} to board outline ({} < {})",
                        item.label,
                        format_nm(clearance),
                        format_nm(min)
                    ),
                    "Copper close to the board edge may be exposed or damaged when the board is milled.",
                    ApprovalKey::new(self.id()).item(item.item),
                    vec![item.outline.clone()],
                ));
            }
        }
        Ok(())
    }
}

pub struct CopperNpthClearanceRule;

impl Rule for CopperNpthClearanceRule {
    fn id(&self) -> &'static str {
        "copper_npth_clearance"
    }

    fn name(&self) -> &str {
        "Checking copper clearance to non-plated holes..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_copper_npth_clearance
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let min = nm(ctx.options.min_copper_npth_clearance);
        for hole in ctx.holes.iter().filter(|h| !h.plated) {
            for item in &ctx.copper {
                if hole.shape.clearance_lower_bound(&item.shape) >= min {
                    continue;
                }
                let clearance = hole.shape.clearance(&item.shape);
                if clearance < min - TOLERANCE {
                    sink.emit(RuleCheckMessage::new(
                        Severity::Error,
                        format!(
                            "Clearance {} to {} ({} < {})",
                            item.label,
                            hole.label,
                            format_nm(clearance),
                            format_nm(min)
                        ),
                        "Copper close to a non-plated hole may be damaged by the drill.",
                        ApprovalKey::new(self.id()).item(hole.item).item(item.item),
                        vec![hole.outline(), item.outline.clone()],
                    ));
                }
            }
        }
        Ok(())
    }
}

pub struct PthRestringRule;

impl PthRestringRule {
    fn emit(
        &self,
        sink: &mut MessageSink<'_>,
        label: &str,
        restring: f64,
        min: f64,
        item: ItemRef,
        location: Path,
    ) {
        sink.emit(RuleCheckMessage::new(
            Severity::Error,
            format!(
                "Annular ring of {} ({} < {})",
                label,
                format_nm(restring),
                format_nm(min)
            ),
            "A thin annular ring may break out when the hole is drilled slightly off-center.",
            ApprovalKey::new(self.id()).item(item),
            vec![location],
        ));
    }
}

impl Rule for PthRestringRule {
    fn id(&self) -> &'static str {
        "pth_restring"
    }

    fn name(&self) -> &str {
        "Checking annular rings..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_pth_restring
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let min = nm(ctx.options.min_pth_restring);

        for via in &ctx.board.vias {
            let restring = (via.size.get().to_nm() - via.drill.get().to_nm()) as f64 / 2.0;
            if restring < min - TOLERANCE {
                self.emit(
                    sink,
                    "via",
                    restring,
                    min,
                    ItemRef::Via { via: via.uuid },
                    circle_at(via.position, via.size),
                );
            }
        }

        for device in &ctx.board.devices {
            for pad in &device.pads {
                if pad.holes().is_empty() {
                    continue;
                }
                let shape = pad_shape(device, pad);
                let transform = device.pad_transform(pad);
                for hole in pad.holes() {
                    let radius = hole.diameter.get().to_nm() as f64 / 2.0;
                    let path = transform.map_path(&hole.path);
                    let restring = path
                        .to_fpoints(ARC_TOLERANCE)
                        .into_iter()
                        .map(|p| shape.inner_clearance(p) - radius)
                        .fold(f64::INFINITY, f64::min);
                    if restring < min - TOLERANCE {
                        let location = match path.vertices() {
                            [drill] => circle_at(drill.pos, hole.diameter),
                            _ => path,
                        };
                        self.emit(
                            sink,
                            &pad_label(device, pad),
                            restring,
                            min,
                            ItemRef::PadHole {
                                device: device.uuid,
                                pad: pad.uuid,
                                hole: hole.uuid,
                            },
                            location,
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// Minimum and maximum diameter of round holes.
pub struct DrillDiameterRule {
    pub plated: bool,
}

impl Rule for DrillDiameterRule {
    fn id(&self) -> &'static str {
        if self.plated {
            "pth_drill_diameter"
        } else {
            "npth_drill_diameter"
        }
    }

    fn name(&self) -> &str {
        if self.plated {
            "Checking PTH drill diameters..."
        } else {
            "Checking NPTH drill diameters..."
        }
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        if self.plated {
            options.check_pth_drill_diameter
        } else {
            options.check_npth_drill_diameter
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let (min, max) = if self.plated {
            (ctx.options.min_pth_drill_diameter, ctx.options.max_pth_drill_diameter)
        } else {
            (ctx.options.min_npth_drill_diameter, ctx.options.max_npth_drill_diameter)
        };
        let (min, max) = (min.get(), max.get());
        let kind = hole_kind(self.plated);

        let holes = ctx.holes.iter().filter(|h| h.plated == self.plated && !h.is_slot());
        for hole in holes {
            let diameter = hole.diameter.get();
            let text = if diameter < min {
                format!("Min. {} drill diameter of {} ({} < {})", kind, hole.label, diameter, min)
            } else if max > Length::zero() && diameter > max {
                format!("Max. {} drill diameter of {} ({} > {})", kind, hole.label, diameter, max)
            } else {
                continue;
            };
            sink.emit(RuleCheckMessage::new(
                Severity::Error,
                text,
                "The fabricator does not offer drills of this size.",
                ApprovalKey::new(self.id()).item(hole.item),
                vec![hole.outline()],
            ));
        }
        Ok(())
    }
}

pub struct SlotWidthRule {
    pub plated: bool,
}

impl Rule for SlotWidthRule {
    fn id(&self) -> &'static str {
        if self.plated {
            "pth_slot_width"
        } else {
            "npth_slot_width"
        }
    }

    fn name(&self) -> &str {
        if self.plated {
            "Checking PTH slot widths..."
        } else {
            "Checking NPTH slot widths..."
        }
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        if self.plated {
            options.check_pth_slot_width
        } else {
            options.check_npth_slot_width
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let min = if self.plated {
            ctx.options.min_pth_slot_width
        } else {
            ctx.options.min_npth_slot_width
        }
        .get();

        let slots = ctx.holes.iter().filter(|h| h.plated == self.plated && h.is_slot());
        for slot in slots {
            let width = slot.diameter.get();
            if width < min {
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!(
                        "Min. {} slot width of {} ({} < {})",
                        hole_kind(self.plated),
                        slot.label,
                        width,
                        min
                    ),
                    "Slots are milled, the fabricator does not offer mill tools of this size.",
                    ApprovalKey::new(self.id()).item(slot.item),
                    vec![slot.outline()],
                ));
            }
        }
        Ok(())
    }
}

/// Warns about slots which some fabricators cannot produce economically.
pub struct SlotWarningRule {
    pub plated: bool,
}

impl SlotWarningRule {
    fn describe(slot: &HoleItem) -> &'static str {
        if slot.path.is_curved() {
            "curved slot"
        } else if slot.path.segment_count() > 1 {
            "multi-segment slot"
        } else {
            "slot"
        }
    }
}

impl Rule for SlotWarningRule {
    fn id(&self) -> &'static str {
        if self.plated {
            "pth_slot_warning"
        } else {
            "npth_slot_warning"
        }
    }

    fn name(&self) -> &str {
        if self.plated {
            "Checking PTH slots..."
        } else {
            "Checking NPTH slots..."
        }
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        if self.plated {
            options.check_pth_slot_warnings
        } else {
            options.check_npth_slot_warnings
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let level = if self.plated {
            ctx.options.pth_slot_warning_level
        } else {
            ctx.options.npth_slot_warning_level
        };

        let slots = ctx.holes.iter().filter(|h| h.plated == self.plated && h.is_slot());
        for slot in slots {
            if !level.applies_to(slot.path.segment_count(), slot.path.is_curved()) {
                continue;
            }
            sink.emit(RuleCheckMessage::new(
                Severity::Warning,
                format!(
                    "{} {} of {}",
                    hole_kind(self.plated),
                    Self::describe(slot),
                    slot.label
                ),
                "Not every fabricator can mill this kind of slot, check the capabilities of yours.",
                ApprovalKey::new(self.id()).item(slot.item),
                vec![slot.outline()],
            ));
        }
        Ok(())
    }
}

pub struct CourtyardOverlapRule;

impl CourtyardOverlapRule {
    fn courtyards(device: &Device, offset: f64) -> Vec<(Path, Shape)> {
        let transform = device.transform();
        device
            .courtyard
            .iter()
            .map(|outline| {
                let path = transform.map_path(outline);
                let shape = Shape::area(&path, 0.0, ARC_TOLERANCE).offset(offset);
                (path, shape)
            })
            .collect()
    }
}

impl Rule for CourtyardOverlapRule {
    fn id(&self) -> &'static str {
        "courtyard_overlap"
    }

    fn name(&self) -> &str {
        "Checking courtyards..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_courtyard_clearance
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let offset = nm(ctx.options.courtyard_offset);
        let devices: Vec<(&Device, BoardSide, Vec<(Path, Shape)>)> = ctx
            .board
            .devices
            .iter()
            .map(|d| (d, d.side(), Self::courtyards(d, offset)))
            .filter(|(_, _, courtyards)| !courtyards.is_empty())
            .collect();

        for (i, (a, side_a, courtyards_a)) in devices.iter().enumerate() {
            for (b, side_b, courtyards_b) in &devices[i + 1..] {
                if side_a != side_b {
                    continue;
                }
                let overlapping = courtyards_a
                    .iter()
                    .any(|(_, sa)| courtyards_b.iter().any(|(_, sb)| sa.overlaps_area(sb)));
                if !overlapping {
                    continue;
                }
                let locations = courtyards_a
                    .iter()
                    .chain(courtyards_b.iter())
                    .map(|(path, _)| path.clone())
                    .collect();
                sink.emit(RuleCheckMessage::new(
                    Severity::Error,
                    format!("Overlapping courtyards of {} and {}", a.name, b.name),
                    "The devices are placed too close to each other for assembly.",
                    ApprovalKey::new(self.id())
                        .item(ItemRef::Device { device: a.uuid })
                        .item(ItemRef::Device { device: b.uuid }),
                    locations,
                ));
            }
        }
        Ok(())
    }
}

/// Traces anchored to a pad or via whose copper does not reach them.
pub struct BrokenPadConnectionRule;

impl BrokenPadConnectionRule {
    /// Returns the anchor's item, label and outline if the connection is broken.
    fn broken_anchor(
        &self,
        ctx: &RuleContext<'_>,
        trace: &Trace,
        anchor: &Anchor,
        end: Point,
    ) -> Result<Option<(ItemRef, String, Path)>, DrcError> {
        let width = trace.width.get().to_nm() as f64;
        let tip = Shape::circle(end.into(), width);

        match anchor {
            Anchor::Pad { device, pad } => {
                let dev = ctx.board.device(device).ok_or_else(|| DrcError::Rule {
                    rule: self.id().to_string(),
                    reason: format!("trace {} references unknown device {}", trace.uuid, device),
                })?;
                let p = dev.pad(pad).ok_or_else(|| DrcError::Rule {
                    rule: self.id().to_string(),
                    reason: format!("trace {} references unknown pad {}", trace.uuid, pad),
                })?;
                let layers = p.copper_layers(dev.side(), &ctx.board.copper_layers());
                let shape = pad_shape(dev, p);
                if layers.contains(&trace.layer) && shape.overlaps(&tip) {
                    return Ok(None);
                }
                Ok(Some((
                    ItemRef::Pad {
                        device: dev.uuid,
                        pad: p.uuid,
                    },
                    pad_label(dev, p),
                    pad_outline(dev, p),
                )))
            }
            Anchor::Via { via } => {
                let v = ctx.board.via(via).ok_or_else(|| DrcError::Rule {
                    rule: self.id().to_string(),
                    reason: format!("trace {} references unknown via {}", trace.uuid, via),
                })?;
                let layers = ctx.board.copper_layers_between(v.start_layer, v.end_layer);
                let shape = Shape::circle(v.position.into(), v.size.get().to_nm() as f64);
                if layers.contains(&trace.layer) && shape.overlaps(&tip) {
                    return Ok(None);
                }
                Ok(Some((
                    ItemRef::Via { via: v.uuid },
                    "via".to_string(),
                    circle_at(v.position, v.size),
                )))
            }
        }
    }
}

impl Rule for BrokenPadConnectionRule {
    fn id(&self) -> &'static str {
        "broken_pad_connection"
    }

    fn name(&self) -> &str {
        "Checking pad connections..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_broken_pad_connections
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        for trace in &ctx.board.traces {
            let anchors = [
                (trace.start_anchor.as_ref(), trace.start),
                (trace.end_anchor.as_ref(), trace.end),
            ];
            for (anchor, end) in anchors {
                let Some(anchor) = anchor else {
                    continue;
                };
                if let Some((item, label, outline)) = self.broken_anchor(ctx, trace, anchor, end)? {
                    sink.emit(RuleCheckMessage::new(
                        Severity::Error,
                        format!("Broken connection of trace on {} to {}", trace.layer, label),
                        "The trace is attached to copper it does not touch, so there is no electrical connection.",
                        ApprovalKey::new(self.id())
                            .item(ItemRef::Trace { trace: trace.uuid })
                            .item(item),
                        vec![Path::line(trace.start, trace.end), outline],
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Hole, Layer, Net, Pad, PadKind, Via};
    use crate::drc::{BoardDesignRuleCheck, DrcState};
    use crate::drc::options::SlotWarningLevel;
    use crate::drc::DrcEvent;
    use crate::geometry::{Angle, PositiveLength, Vertex};
    use uuid::Uuid;

    fn mm(v: f64) -> PositiveLength {
        PositiveLength::from_mm(v).unwrap()
    }

    fn trace(net: Option<Uuid>, layer: Layer, start: Point, end: Point, width: f64) -> Trace {
        Trace {
            uuid: Uuid::new_v4(),
            net,
            layer,
            start,
            end,
            width: mm(width),
            start_anchor: None,
            end_anchor: None,
        }
    }

    fn device(name: &str, position: Point, pads: Vec<Pad>) -> Device {
        Device {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            value: String::new(),
            device_name: String::new(),
            package_name: String::new(),
            position,
            rotation: Angle::deg0(),
            mirrored: false,
            assembly_type: Default::default(),
            pads,
            holes: vec![],
            courtyard: vec![],
        }
    }

    fn square(size: f64) -> Path {
        let h = size / 2.0;
        Path::polygon(&[
            Point::from_mm(-h, -h),
            Point::from_mm(h, -h),
            Point::from_mm(h, h),
            Point::from_mm(-h, h),
            Point::from_mm(-h, -h),
        ])
    }

    fn run(rule: &dyn Rule, board: &Board, options: &DrcOptions) -> Result<Vec<RuleCheckMessage>, DrcError> {
        let ctx = RuleContext::new(board, options)?;
        let mut observer = |_: DrcEvent| {};
        let mut sink = MessageSink::new(&mut observer);
        rule.check(&ctx, &mut sink)?;
        Ok(sink.into_messages())
    }

    #[test]
    fn test_default_catalogue_order() {
        let engine = RulesEngine::with_default_rules();
        let ids: Vec<&str> = engine.rules().iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![
                "copper_width",
                "copper_clearance",
                "copper_board_clearance",
                "copper_npth_clearance",
                "pth_restring",
                "pth_drill_diameter",
                "npth_drill_diameter",
                "pth_slot_width",
                "npth_slot_width",
                "pth_slot_warning",
                "npth_slot_warning",
                "courtyard_overlap",
                "broken_pad_connection",
                "missing_connection",
            ]
        );
    }

    #[test]
    fn test_copper_width() {
        let mut board = Board::new("test");
        board.traces.push(trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.15));
        board.traces.push(trace(None, Layer::TopCopper, Point::from_mm(0.0, 5.0), Point::from_mm(5.0, 5.0), 0.25));

        let messages = run(&CopperWidthRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Error);
        assert!(messages[0].message.contains("0.15mm < 0.2mm"), "{}", messages[0].message);
        assert!(messages[0].approval.contains(&board.traces[0].uuid.to_string()));
    }

    #[test]
    fn test_copper_clearance_between_nets() {
        let mut board = Board::new("test");
        let (gnd, vcc) = (Uuid::new_v4(), Uuid::new_v4());
        board.nets.push(Net { uuid: gnd, name: "GND".into() });
        board.nets.push(Net { uuid: vcc, name: "VCC".into() });
        // edges 0.1mm apart
        board.traces.push(trace(Some(gnd), Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2));
        board.traces.push(trace(Some(vcc), Layer::TopCopper, Point::from_mm(0.0, 0.3), Point::from_mm(2.0, 0.3), 0.2));
        // same net, overlapping
        board.traces.push(trace(Some(gnd), Layer::TopCopper, Point::from_mm(5.0, 0.0), Point::from_mm(5.0, -5.0), 0.2));
        // other layer
        board.traces.push(trace(Some(vcc), Layer::BottomCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2));

        let messages = run(&CopperClearanceRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 1, "{:?}", messages);
        assert!(messages[0].message.contains("(0.1mm < 0.2mm)"), "{}", messages[0].message);
        assert!(messages[0].approval.contains("(layer top_copper)"));
    }

    #[test]
    fn test_touching_copper_without_net_is_connected() {
        let mut board = Board::new("test");
        board.traces.push(trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2));
        board.traces.push(trace(None, Layer::TopCopper, Point::from_mm(5.0, 0.0), Point::from_mm(5.0, 5.0), 0.2));
        board.traces.push(trace(None, Layer::TopCopper, Point::from_mm(0.0, 0.3), Point::from_mm(4.0, 0.3), 0.2));

        let messages = run(&CopperClearanceRule, &board, &DrcOptions::default()).unwrap();
        // only the separate third trace is too close to the first one
        assert_eq!(messages.len(), 1);
        assert!(messages[0].approval.contains(&board.traces[2].uuid.to_string()));
    }

    #[test]
    fn test_missing_outline_warning() {
        let mut board = Board::new("test");
        board.traces.push(trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2));
        let messages = run(&CopperBoardClearanceRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Warning);
        assert_eq!(messages[0].approval, "(approved missing_board_outline)");
    }

    #[test]
    fn test_copper_board_clearance() {
        let mut board = Board::new("test");
        board.outlines.push(square(20.0));
        board.traces.push(trace(None, Layer::TopCopper, Point::from_mm(-5.0, 9.8), Point::from_mm(5.0, 9.8), 0.2));
        board.traces.push(trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2));
        let messages = run(&CopperBoardClearanceRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains("(0.1mm < 0.3mm)"), "{}", messages[0].message);
    }

    #[test]
    fn test_npth_clearance_and_diameter() {
        let mut board = Board::new("test");
        board.holes.push(Hole {
            uuid: Uuid::new_v4(),
            diameter: mm(1.0),
            path: Path::point(Point::origin()),
        });
        board.holes.push(Hole {
            uuid: Uuid::new_v4(),
            diameter: mm(0.2),
            path: Path::point(Point::from_mm(10.0, 10.0)),
        });
        board.traces.push(trace(None, Layer::TopCopper, Point::from_mm(-5.0, 0.8), Point::from_mm(5.0, 0.8), 0.2));

        let options = DrcOptions::default();
        let clearance = run(&CopperNpthClearanceRule, &board, &options).unwrap();
        assert_eq!(clearance.len(), 1);
        assert!(clearance[0].message.contains("(0.2mm < 0.25mm)"), "{}", clearance[0].message);

        let diameter = run(&DrillDiameterRule { plated: false }, &board, &options).unwrap();
        assert_eq!(diameter.len(), 1);
        assert!(diameter[0].message.starts_with("Min. NPTH drill diameter"));
        assert!(run(&DrillDiameterRule { plated: true }, &board, &options).unwrap().is_empty());
    }

    #[test]
    fn test_max_drill_zero_is_unlimited() {
        let mut board = Board::new("test");
        board.holes.push(Hole {
            uuid: Uuid::new_v4(),
            diameter: mm(8.0),
            path: Path::point(Point::origin()),
        });
        let mut options = DrcOptions::default();
        assert_eq!(run(&DrillDiameterRule { plated: false }, &board, &options).unwrap().len(), 1);
        options.max_npth_drill_diameter = UnsignedLength::zero();
        assert!(run(&DrillDiameterRule { plated: false }, &board, &options).unwrap().is_empty());
    }

    #[test]
    fn test_restring() {
        let mut board = Board::new("test");
        board.vias.push(Via {
            uuid: Uuid::new_v4(),
            net: None,
            position: Point::origin(),
            size: mm(0.6),
            drill: mm(0.3),
            start_layer: Layer::TopCopper,
            end_layer: Layer::BottomCopper,
            exposed: false,
        });
        let pad = Pad::tht("1", Point::origin(), Length::from_mm(1.6), Length::from_mm(1.0)).unwrap();
        board.devices.push(device("J1", Point::from_mm(10.0, 0.0), vec![pad]));

        let messages = run(&PthRestringRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains("(0.15mm < 0.2mm)"), "{}", messages[0].message);

        let mut options = DrcOptions::default();
        options.min_pth_restring = UnsignedLength::from_mm(0.31).unwrap();
        let messages = run(&PthRestringRule, &board, &options).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].message.starts_with("Annular ring of pad J1.1"));
    }

    #[test]
    fn test_slot_rules() {
        let mut board = Board::new("test");
        let curved = Path::new(vec![
            Vertex::new(Point::origin(), Angle::deg90()),
            Vertex::straight(Point::from_mm(2.0, 0.0)),
        ]);
        board.holes.push(Hole {
            uuid: Uuid::new_v4(),
            diameter: mm(0.8),
            path: curved,
        });
        board.holes.push(Hole {
            uuid: Uuid::new_v4(),
            diameter: mm(1.2),
            path: Path::line(Point::from_mm(0.0, 5.0), Point::from_mm(3.0, 5.0)),
        });

        let options = DrcOptions::default();
        let width = run(&SlotWidthRule { plated: false }, &board, &options).unwrap();
        assert_eq!(width.len(), 1);
        assert!(width[0].message.contains("(0.8mm < 1.0mm)"), "{}", width[0].message);

        let warnings = run(&SlotWarningRule { plated: false }, &board, &options).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
        assert!(warnings[0].message.starts_with("NPTH curved slot"));

        let mut options = DrcOptions::default();
        options.npth_slot_warning_level = SlotWarningLevel::All;
        assert_eq!(run(&SlotWarningRule { plated: false }, &board, &options).unwrap().len(), 2);
        assert!(run(&SlotWarningRule { plated: true }, &board, &options).unwrap().is_empty());
    }

    #[test]
    fn test_courtyard_overlap() {
        let mut board = Board::new("test");
        let mut r1 = device("R1", Point::origin(), vec![]);
        r1.courtyard.push(square(2.0));
        let mut r2 = device("R2", Point::from_mm(2.0, 0.0), vec![]);
        r2.courtyard.push(square(2.0));
        let mut r3 = device("R3", Point::from_mm(3.0, 0.0), vec![]);
        r3.courtyard.push(square(2.0));
        r3.mirrored = true;
        board.devices = vec![r1, r2, r3];

        // R1 and R2 only touch, R3 is on the bottom side
        let options = DrcOptions::default();
        assert!(run(&CourtyardOverlapRule, &board, &options).unwrap().is_empty());

        let mut options = DrcOptions::default();
        options.courtyard_offset = UnsignedLength::from_mm(0.1).unwrap();
        let messages = run(&CourtyardOverlapRule, &board, &options).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "Overlapping courtyards of R1 and R2");
        assert_eq!(messages[0].locations.len(), 2);
    }

    #[test]
    fn test_broken_pad_connection() {
        let mut board = Board::new("test");
        let pad = Pad::smt("1", Point::origin(), Length::from_mm(1.0), Length::from_mm(1.0)).unwrap();
        let (device_uuid, pad_uuid) = {
            let d = device("U1", Point::origin(), vec![pad]);
            let ids = (d.uuid, d.pads[0].uuid);
            board.devices.push(d);
            ids
        };
        let anchor = Anchor::Pad {
            device: device_uuid,
            pad: pad_uuid,
        };

        let mut ok = trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2);
        ok.start_anchor = Some(anchor);
        let mut wrong_layer = trace(None, Layer::BottomCopper, Point::origin(), Point::from_mm(0.0, 5.0), 0.2);
        wrong_layer.start_anchor = Some(anchor);
        let mut detached = trace(None, Layer::TopCopper, Point::from_mm(3.0, 0.0), Point::from_mm(3.0, 5.0), 0.2);
        detached.start_anchor = Some(anchor);
        board.traces = vec![ok, wrong_layer, detached];

        let messages = run(&BrokenPadConnectionRule, &board, &DrcOptions::default()).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.message.ends_with("pad U1.1")));
    }

    #[test]
    fn test_drill_without_position_fails_run() {
        let mut board = Board::new("test");
        let hole = Uuid::new_v4();
        board.holes.push(Hole {
            uuid: hole,
            diameter: mm(0.1),
            path: Path::new(vec![]),
        });

        let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
        let result = drc.execute(&mut |_: DrcEvent| {});
        match result {
            Err(DrcError::InvalidBoard(reason)) => {
                assert!(reason.contains(&hole.to_string()), "{}", reason)
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(drc.state(), DrcState::Failed);
        assert!(drc.messages().is_empty());
    }

    #[test]
    fn test_pad_hole_without_position_is_rejected() {
        let mut pad = Pad::tht("1", Point::origin(), Length::from_mm(1.6), Length::from_mm(1.0)).unwrap();
        if let PadKind::Tht { holes } = &mut pad.kind {
            holes[0].path = Path::new(vec![]);
        }
        let mut board = Board::new("test");
        board.devices.push(device("J1", Point::from_mm(10.0, 0.0), vec![pad]));

        let result = run(&PthRestringRule, &board, &DrcOptions::default());
        assert!(matches!(result, Err(DrcError::InvalidBoard(_))), "{:?}", result);
    }

    #[test]
    fn test_unknown_anchor_fails() {
        let mut board = Board::new("test");
        let mut t = trace(None, Layer::TopCopper, Point::origin(), Point::from_mm(5.0, 0.0), 0.2);
        t.end_anchor = Some(Anchor::Via { via: Uuid::new_v4() });
        board.traces.push(t);
        let result = run(&BrokenPadConnectionRule, &board, &DrcOptions::default());
        assert!(matches!(result, Err(DrcError::Rule { .. })));
    }
}
