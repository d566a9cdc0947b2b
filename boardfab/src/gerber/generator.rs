//! RS-274X (Gerber X2/X3) layer writer.
//!
//! Coordinates use the `6.6` millimeter format, so every coordinate is the
//! plain nanometer integer. The file ends with an MD5 checksum attribute
//! computed over all preceding content without line breaks.

use std::path::Path as FsPath;

use super::aperture_list::ApertureList;
use super::attribute::{
    ApertureFunction, Attribute, AttributeStyle, FileFunction, FileMetadata, MountType,
};
use super::GerberError;
use crate::geometry::toolbox::arc_center;
use crate::geometry::{Angle, Length, Path, Point, PositiveLength, UnsignedLength};

/// Dark adds material, clear removes it from what was drawn before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayerPolarity {
    #[default]
    Dark,
    Clear,
}

/// `TO` attributes attached to the following graphical objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub net: Option<String>,
    pub component: Option<String>,
    /// Component designator and pin name.
    pub pin: Option<(String, String)>,
}

impl ObjectAttributes {
    pub fn net(net: impl Into<String>) -> Self {
        Self {
            net: Some(net.into()),
            ..Self::default()
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_pin(mut self, component: impl Into<String>, pin: impl Into<String>) -> Self {
        self.pin = Some((component.into(), pin.into()));
        self
    }

    fn to_attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        if let Some(net) = &self.net {
            attributes.push(Attribute::ObjectNet(net.clone()));
        }
        if let Some(component) = &self.component {
            attributes.push(Attribute::ObjectComponent(component.clone()));
        }
        if let Some((component, pin)) = &self.pin {
            attributes.push(Attribute::ObjectPin {
                component: component.clone(),
                pin: pin.clone(),
                function: None,
            });
        }
        attributes
    }
}

/// Component data for the `ComponentMain` flash of X3 component layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFlash {
    pub designator: String,
    pub value: String,
    pub mount: MountType,
    pub footprint: String,
    pub rotation: Angle,
}

pub struct GerberGenerator {
    metadata: FileMetadata,
    function: Option<FileFunction>,
    style: AttributeStyle,
    apertures: ApertureList,
    body: String,
    current_aperture: Option<u32>,
    object_attributes: Vec<Attribute>,
    output: String,
}

impl GerberGenerator {
    pub fn new(metadata: FileMetadata, function: Option<FileFunction>) -> Self {
        Self::with_attribute_style(metadata, function, AttributeStyle::default())
    }

    pub fn with_attribute_style(
        metadata: FileMetadata,
        function: Option<FileFunction>,
        style: AttributeStyle,
    ) -> Self {
        Self {
            metadata,
            function,
            style,
            apertures: ApertureList::with_attribute_style(style),
            body: String::new(),
            current_aperture: None,
            object_attributes: Vec::new(),
            output: String::new(),
        }
    }

    pub fn set_layer_polarity(&mut self, polarity: LayerPolarity) {
        match polarity {
            LayerPolarity::Dark => self.body.push_str("%LPD*%\n"),
            LayerPolarity::Clear => self.body.push_str("%LPC*%\n"),
        }
    }

    pub fn draw_line(
        &mut self,
        start: Point,
        end: Point,
        width: UnsignedLength,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        let aperture = self.apertures.add_circle(width, function);
        self.set_object_attributes(attributes);
        self.select_aperture(aperture);
        self.move_to(start);
        self.line_to(end);
    }

    /// Stroke a path with a round aperture, following its arcs.
    pub fn draw_path_outline(
        &mut self,
        path: &Path,
        line_width: UnsignedLength,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        if path.len() < 2 {
            tracing::warn!("skipping outline with less than two vertices");
            return;
        }
        let aperture = self.apertures.add_circle(line_width, function);
        self.set_object_attributes(attributes);
        self.select_aperture(aperture);
        self.interpolate_path(path);
    }

    /// Fill a closed path as a region.
    pub fn draw_path_area(
        &mut self,
        path: &Path,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        if !path.is_closed() {
            tracing::warn!("skipping region with an open outline");
            return;
        }
        self.set_object_attributes(attributes);
        if let Some(function) = function {
            self.push_attribute(&Attribute::ApertureFunction(function));
        }
        self.body.push_str("G36*\n");
        self.interpolate_path(path);
        self.body.push_str("G37*\n");
        if function.is_some() {
            self.push_attribute(&Attribute::DeleteApertureFunction);
        }
    }

    pub fn flash_circle(
        &mut self,
        position: Point,
        diameter: PositiveLength,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        let aperture = self.apertures.add_circle(diameter.to_unsigned(), function);
        self.flash(aperture, position, attributes);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn flash_rect(
        &mut self,
        position: Point,
        width: PositiveLength,
        height: PositiveLength,
        corner_radius: UnsignedLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        let aperture = self
            .apertures
            .add_rect(width, height, corner_radius, rotation, function);
        self.flash(aperture, position, attributes);
    }

    pub fn flash_obround(
        &mut self,
        position: Point,
        width: PositiveLength,
        height: PositiveLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        let aperture = self.apertures.add_obround(width, height, rotation, function);
        self.flash(aperture, position, attributes);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn flash_octagon(
        &mut self,
        position: Point,
        width: PositiveLength,
        height: PositiveLength,
        corner_radius: UnsignedLength,
        rotation: Angle,
        function: Option<ApertureFunction>,
        attributes: &ObjectAttributes,
    ) {
        let aperture = self
            .apertures
            .add_octagon(width, height, corner_radius, rotation, function);
        self.flash(aperture, position, attributes);
    }

    /// Component reference point with its X3 attributes.
    pub fn flash_component(&mut self, position: Point, component: &ComponentFlash) {
        let aperture = self.apertures.add_component_main();
        let mut attributes = vec![Attribute::ObjectComponent(component.designator.clone())];
        attributes.push(Attribute::ComponentRotation(component.rotation));
        if !component.value.is_empty() {
            attributes.push(Attribute::ComponentValue(component.value.clone()));
        }
        attributes.push(Attribute::ComponentMount(component.mount));
        if !component.footprint.is_empty() {
            attributes.push(Attribute::ComponentFootprint(component.footprint.clone()));
        }
        self.replace_object_attributes(attributes);
        self.select_aperture(aperture);
        self.body.push_str(&format!("{}D03*\n", coordinates(position)));
    }

    pub fn flash_component_pin(
        &mut self,
        position: Point,
        designator: &str,
        pin: &str,
        pin1: bool,
    ) {
        let aperture = self.apertures.add_component_pin(pin1);
        let attributes = ObjectAttributes::default().with_pin(designator, pin);
        self.flash(aperture, position, &attributes);
    }

    /// Assemble the complete file. Further drawing calls are not allowed.
    pub fn generate(&mut self) {
        self.set_object_attributes(&ObjectAttributes::default());
        let mut out = String::new();
        out.push_str("G04 --- HEADER BEGIN --- *\n");
        for attribute in self.metadata.header_attributes(self.function) {
            out.push_str(&attribute.to_gerber_string(self.style));
        }
        out.push_str("%FSLAX66Y66*%\n");
        out.push_str("%MOMM*%\n");
        out.push_str("G01*\n");
        out.push_str("G75*\n");
        out.push_str("G04 --- HEADER END --- *\n");
        out.push_str("G04 --- APERTURE LIST BEGIN --- *\n");
        out.push_str(&self.apertures.generate_string());
        out.push_str("G04 --- APERTURE LIST END --- *\n");
        out.push_str("G04 --- BOARD BEGIN --- *\n");
        out.push_str(&self.body);
        out.push_str("G04 --- BOARD END --- *\n");

        let unwrapped: String = out.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let checksum = format!("{:x}", md5::compute(unwrapped.as_bytes()));
        out.push_str(&Attribute::Md5(checksum).to_gerber_string(self.style));
        out.push_str("M02*\n");
        tracing::debug!(
            "generated gerber file with {} apertures ({} bytes)",
            self.apertures.len(),
            out.len()
        );
        self.output = out;
    }

    /// Output of the last [`GerberGenerator::generate`] call.
    pub fn to_str(&self) -> &str {
        &self.output
    }

    pub fn save_to_file(&self, path: &FsPath) -> Result<(), GerberError> {
        crate::core::write_file_atomic(path, self.output.as_bytes())?;
        Ok(())
    }

    fn flash(&mut self, aperture: u32, position: Point, attributes: &ObjectAttributes) {
        self.set_object_attributes(attributes);
        self.select_aperture(aperture);
        self.body.push_str(&format!("{}D03*\n", coordinates(position)));
    }

    fn select_aperture(&mut self, aperture: u32) {
        if self.current_aperture != Some(aperture) {
            self.body.push_str(&format!("D{}*\n", aperture));
            self.current_aperture = Some(aperture);
        }
    }

    fn set_object_attributes(&mut self, attributes: &ObjectAttributes) {
        self.replace_object_attributes(attributes.to_attributes());
    }

    /// Emit `TO` attributes only when they differ from the active ones.
    fn replace_object_attributes(&mut self, attributes: Vec<Attribute>) {
        if attributes == self.object_attributes {
            return;
        }
        if !self.object_attributes.is_empty() {
            self.push_attribute(&Attribute::Delete);
        }
        for attribute in &attributes {
            self.push_attribute(attribute);
        }
        self.object_attributes = attributes;
    }

    fn push_attribute(&mut self, attribute: &Attribute) {
        self.body.push_str(&attribute.to_gerber_string(self.style));
    }

    fn move_to(&mut self, p: Point) {
        self.body.push_str(&format!("{}D02*\n", coordinates(p)));
    }

    fn line_to(&mut self, p: Point) {
        self.body.push_str(&format!("G01{}D01*\n", coordinates(p)));
    }

    fn interpolate_path(&mut self, path: &Path) {
        let mut segments = path.segments().peekable();
        if let Some((first, _)) = segments.peek() {
            self.move_to(first.pos);
        }
        for (from, to) in segments {
            match arc_center(from.pos, to.pos, from.angle) {
                Some(center) => {
                    let center = center.to_point();
                    let i = center.x - from.pos.x;
                    let j = center.y - from.pos.y;
                    let code = if from.angle < Angle::deg0() { "G02" } else { "G03" };
                    self.body.push_str(&format!(
                        "{}{}I{}J{}D01*\n",
                        code,
                        coordinates(to.pos),
                        nm(i),
                        nm(j)
                    ));
                }
                None => self.line_to(to.pos),
            }
        }
    }
}

fn nm(length: Length) -> i64 {
    length.to_nm()
}

fn coordinates(p: Point) -> String {
    format!("X{}Y{}", nm(p.x), nm(p.y))
}
