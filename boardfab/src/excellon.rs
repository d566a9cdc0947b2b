//! Excellon drill file writer
//!
//! Drills and slots are collected per tool and written as one metric
//! Excellon file with Gerber X2 attributes embedded as `; #@!` comments.
//!
//! ```
//! use boardfab::excellon::ExcellonGenerator;
//! use boardfab::geometry::{Point, PositiveLength};
//! use boardfab::gerber::{ApertureFunction, FileMetadata, Plating};
//!
//! let meta = FileMetadata::new("demo", uuid::Uuid::nil(), "1");
//! let mut excellon = ExcellonGenerator::new(meta, Plating::Yes, 1, 2);
//! let drill = PositiveLength::from_mm(0.8).unwrap();
//! excellon.drill(Point::from_mm(1.0, 2.0), drill, true, ApertureFunction::ComponentDrill);
//! excellon.generate().unwrap();
//! assert!(excellon.to_str().contains("T1C0.8\n"));
//! ```

use std::path::Path as FsPath;

use thiserror::Error;

use crate::geometry::toolbox::arc_radius;
use crate::geometry::{Angle, Length, Path, Point, PositiveLength};
use crate::gerber::{ApertureFunction, Attribute, FileFunction, FileMetadata, Plating};

#[derive(Debug, Error)]
pub enum ExcellonError {
    #[error("Curved slots cannot be written with G85 canned cycles")]
    CurvedSlotWithG85,

    #[error("Failed to write drill file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Tool {
    diameter: PositiveLength,
    plated: bool,
    function: ApertureFunction,
}

pub struct ExcellonGenerator {
    metadata: FileMetadata,
    plating: Plating,
    from_layer: u8,
    to_layer: u8,
    use_g85_slots: bool,
    /// Tools in order of first use, each with its drills and slots.
    tools: Vec<(Tool, Vec<Path>)>,
    output: String,
}

impl ExcellonGenerator {
    /// `from_layer` and `to_layer` are the copper layer numbers (1 = top)
    /// spanned by the holes of this file.
    pub fn new(metadata: FileMetadata, plating: Plating, from_layer: u8, to_layer: u8) -> Self {
        Self {
            metadata,
            plating,
            from_layer,
            to_layer,
            use_g85_slots: false,
            tools: Vec::new(),
            output: String::new(),
        }
    }

    /// Write slots as `G85` canned cycles instead of routed paths.
    pub fn set_use_g85_slots(&mut self, enabled: bool) {
        self.use_g85_slots = enabled;
    }

    pub fn drill(
        &mut self,
        position: Point,
        diameter: PositiveLength,
        plated: bool,
        function: ApertureFunction,
    ) {
        self.drill_path(&Path::point(position), diameter, plated, function);
    }

    /// A single vertex path is a round drill, anything longer a slot.
    pub fn drill_path(
        &mut self,
        path: &Path,
        diameter: PositiveLength,
        plated: bool,
        function: ApertureFunction,
    ) {
        if path.is_empty() {
            tracing::warn!("ignoring drill without position");
            return;
        }
        let tool = Tool {
            diameter,
            plated,
            function,
        };
        match self.tools.iter_mut().find(|(t, _)| *t == tool) {
            Some((_, paths)) => paths.push(path.clone()),
            None => self.tools.push((tool, vec![path.clone()])),
        }
    }

    pub fn generate(&mut self) -> Result<(), ExcellonError> {
        if self.use_g85_slots
            && self
                .tools
                .iter()
                .flat_map(|(_, paths)| paths)
                .any(|p| p.len() > 1 && p.is_curved())
        {
            return Err(ExcellonError::CurvedSlotWithG85);
        }

        let mut out = String::new();
        self.print_header(&mut out);
        for (index, (_, paths)) in self.tools.iter().enumerate() {
            out.push_str(&format!("T{}\n", index + 1));
            for path in paths {
                if let [drill] = path.vertices() {
                    out.push_str(&format!("{}\n", coordinates(drill.pos)));
                } else if self.use_g85_slots {
                    print_g85_slot(&mut out, path);
                } else {
                    print_routed_slot(&mut out, path);
                }
            }
            tracing::trace!("tool T{} has {} holes", index + 1, paths.len());
        }
        out.push_str("T0\n");
        out.push_str("M30\n");
        tracing::debug!(
            "generated excellon file with {} tools ({} bytes)",
            self.tools.len(),
            out.len()
        );
        self.output = out;
        Ok(())
    }

    /// Output of the last successful [`ExcellonGenerator::generate`] call.
    pub fn to_str(&self) -> &str {
        &self.output
    }

    pub fn save_to_file(&self, path: &FsPath) -> Result<(), ExcellonError> {
        crate::core::write_file_atomic(path, self.output.as_bytes())?;
        Ok(())
    }

    fn print_header(&self, out: &mut String) {
        out.push_str("M48\n");
        let function = FileFunction::Drill {
            plating: self.plating,
            from: self.from_layer,
            to: self.to_layer,
        };
        for attribute in self.metadata.header_attributes(Some(function)) {
            out.push_str(&attribute.to_excellon_string());
        }
        out.push_str("FMAT,2\n");
        out.push_str("METRIC,TZ\n");
        for (index, (tool, _)) in self.tools.iter().enumerate() {
            let attribute = Attribute::DrillFunction {
                plated: tool.plated,
                function: tool.function,
            };
            out.push_str(&attribute.to_excellon_string());
            out.push_str(&format!(
                "T{}C{}\n",
                index + 1,
                tool.diameter.get().to_mm_string()
            ));
        }
        out.push_str("%\n");
        out.push_str("G90\n");
        out.push_str("G05\n");
        out.push_str("M71\n");
    }
}

fn mm(length: Length) -> String {
    length.to_mm_string()
}

fn coordinates(p: Point) -> String {
    format!("X{}Y{}", mm(p.x), mm(p.y))
}

fn print_routed_slot(out: &mut String, path: &Path) {
    let vertices = path.vertices();
    out.push_str(&format!("G00{}\n", coordinates(vertices[0].pos)));
    out.push_str("M15\n");
    for (from, to) in path.segments() {
        if from.angle.is_zero() {
            out.push_str(&format!("G01{}\n", coordinates(to.pos)));
        } else {
            let code = if from.angle < Angle::deg0() { "G02" } else { "G03" };
            let radius = arc_radius(from.pos, to.pos, from.angle);
            out.push_str(&format!("{}{}A{}\n", code, coordinates(to.pos), mm(radius)));
        }
    }
    out.push_str("M16\n");
    out.push_str("G05\n");
}

fn print_g85_slot(out: &mut String, path: &Path) {
    for (from, to) in path.segments() {
        out.push_str(&format!(
            "{}G85{}\n",
            coordinates(from.pos),
            coordinates(to.pos)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vertex;
    use chrono::{FixedOffset, TimeZone};
    use uuid::Uuid;

    fn generator(plating: Plating) -> ExcellonGenerator {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let meta = FileMetadata::new("demo", Uuid::nil(), "1").with_creation_date(date);
        ExcellonGenerator::new(meta, plating, 1, 2)
    }

    fn pl(nm: i64) -> PositiveLength {
        PositiveLength::new(Length::new(nm)).unwrap()
    }

    fn body(s: &str) -> &str {
        &s[s.find("M71\n").unwrap() + 4..]
    }

    #[test]
    fn test_mixed_plating_file() {
        let mut g = generator(Plating::Mixed);
        g.drill(Point::from_nm(111, 222), pl(500_000), true, ApertureFunction::ComponentDrill);
        g.drill(Point::from_nm(333, 444), pl(600_000), false, ApertureFunction::MechanicalDrill);
        g.generate().unwrap();
        let expected = "M48\n\
            ; #@! TF.GenerationSoftware,boardfab,boardfab,VERSION\n\
            ; #@! TF.CreationDate,2024-01-01T00:00:00+00:00\n\
            ; #@! TF.ProjectId,demo,00000000-0000-0000-0000-000000000000,1\n\
            ; #@! TF.Part,Single\n\
            ; #@! TF.SameCoordinates\n\
            ; #@! TF.FileFunction,MixedPlating,1,2\n\
            ; #@! TF.FilePolarity,Positive\n\
            FMAT,2\n\
            METRIC,TZ\n\
            ; #@! TA.AperFunction,Plated,PTH,ComponentDrill\n\
            T1C0.5\n\
            ; #@! TA.AperFunction,NonPlated,NPTH,MechanicalDrill\n\
            T2C0.6\n\
            %\n\
            G90\n\
            G05\n\
            M71\n\
            T1\n\
            X0.000111Y0.000222\n\
            T2\n\
            X0.000333Y0.000444\n\
            T0\n\
            M30\n"
            .replace("VERSION", env!("CARGO_PKG_VERSION"));
        assert_eq!(g.to_str(), expected);
    }

    #[test]
    fn test_tools_grouped_in_order_of_first_use() {
        let mut g = generator(Plating::Yes);
        let f = ApertureFunction::ViaDrill;
        g.drill(Point::from_nm(1_000_000, 0), pl(300_000), true, f);
        g.drill(Point::from_nm(2_000_000, 0), pl(400_000), true, f);
        g.drill(Point::from_nm(3_000_000, 0), pl(300_000), true, f);
        g.generate().unwrap();
        assert_eq!(
            body(g.to_str()),
            "T1\nX1.0Y0.0\nX3.0Y0.0\nT2\nX2.0Y0.0\nT0\nM30\n"
        );
    }

    #[test]
    fn test_same_diameter_different_function_gets_own_tool() {
        let mut g = generator(Plating::Yes);
        g.drill(Point::origin(), pl(300_000), true, ApertureFunction::ViaDrill);
        g.drill(Point::origin(), pl(300_000), true, ApertureFunction::ComponentDrill);
        g.generate().unwrap();
        assert!(g.to_str().contains("T1C0.3\n"));
        assert!(g.to_str().contains("T2C0.3\n"));
    }

    #[test]
    fn test_drill_without_position_is_skipped() {
        let mut g = generator(Plating::No);
        g.drill_path(&Path::new(vec![]), pl(1_000_000), false, ApertureFunction::MechanicalDrill);
        g.drill(Point::from_nm(2_000_000, 0), pl(500_000), false, ApertureFunction::MechanicalDrill);
        g.generate().unwrap();
        assert!(!g.to_str().contains("C1.0\n"));
        assert!(g.to_str().contains("; #@! TA.AperFunction,NonPlated,NPTH,MechanicalDrill\nT1C0.5\n%\n"));
        assert_eq!(body(g.to_str()), "T1\nX2.0Y0.0\nT0\nM30\n");
    }

    #[test]
    fn test_straight_slot() {
        let mut g = generator(Plating::No);
        let slot = Path::line(Point::from_nm(0, 0), Point::from_nm(2_000_000, 0));
        g.drill_path(&slot, pl(1_000_000), false, ApertureFunction::MechanicalDrill);
        g.generate().unwrap();
        assert_eq!(
            body(g.to_str()),
            "T1\nG00X0.0Y0.0\nM15\nG01X2.0Y0.0\nM16\nG05\nT0\nM30\n"
        );
    }

    #[test]
    fn test_curved_slot() {
        let mut g = generator(Plating::Yes);
        let slot = Path::new(vec![
            Vertex::new(Point::from_nm(0, 0), Angle::deg180()),
            Vertex::new(Point::from_nm(1_000_000, 0), -Angle::deg90()),
            Vertex::straight(Point::from_nm(1_500_000, 500_000)),
        ]);
        g.drill_path(&slot, pl(300_000), true, ApertureFunction::ComponentDrill);
        g.generate().unwrap();
        assert_eq!(
            body(g.to_str()),
            "T1\nG00X0.0Y0.0\nM15\nG03X1.0Y0.0A0.5\nG02X1.5Y0.5A0.5\nM16\nG05\nT0\nM30\n"
        );
    }

    #[test]
    fn test_g85_slots() {
        let mut g = generator(Plating::No);
        g.set_use_g85_slots(true);
        let slot = Path::new(vec![
            Vertex::straight(Point::from_nm(0, 0)),
            Vertex::straight(Point::from_nm(1_000_000, 0)),
            Vertex::straight(Point::from_nm(1_000_000, 1_000_000)),
        ]);
        g.drill_path(&slot, pl(800_000), false, ApertureFunction::MechanicalDrill);
        g.drill(Point::from_nm(5_000_000, 5_000_000), pl(800_000), false, ApertureFunction::MechanicalDrill);
        g.generate().unwrap();
        assert_eq!(
            body(g.to_str()),
            "T1\nX0.0Y0.0G85X1.0Y0.0\nX1.0Y0.0G85X1.0Y1.0\nX5.0Y5.0\nT0\nM30\n"
        );
    }

    #[test]
    fn test_g85_rejects_curved_slots() {
        let mut g = generator(Plating::Yes);
        g.set_use_g85_slots(true);
        let slot = Path::new(vec![
            Vertex::new(Point::from_nm(0, 0), Angle::deg45()),
            Vertex::straight(Point::from_nm(1_000_000, 0)),
        ]);
        g.drill_path(&slot, pl(500_000), true, ApertureFunction::ComponentDrill);
        assert!(matches!(g.generate(), Err(ExcellonError::CurvedSlotWithG85)));
        assert!(g.to_str().is_empty());
    }

    #[test]
    fn test_empty_file() {
        let mut g = generator(Plating::Yes);
        g.generate().unwrap();
        assert!(g.to_str().contains("METRIC,TZ\n%\nG90\nG05\nM71\nT0\nM30\n"));
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drills.drl");
        let mut g = generator(Plating::Yes);
        g.drill(Point::origin(), pl(300_000), true, ApertureFunction::ViaDrill);
        g.generate().unwrap();
        g.save_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), g.to_str());
    }
}
