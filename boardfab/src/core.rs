//! Core entry points shared by the CLI and embedding applications.
//! Loads board snapshots, runs checks and exports, and nothing else.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::board::Board;
use crate::drc::{ApprovalSet, BoardDesignRuleCheck, DrcError, DrcEvent, DrcOptions, RuleCheckMessage, Severity};
use crate::excellon::ExcellonError;
use crate::export::{BoardFabricationExport, ExportError, FabricationSettings};
use crate::geometry::GeometryError;
use crate::gerber::GerberError;
use crate::pick_place::PickPlaceError;

#[derive(Debug, thiserror::Error)]
pub enum BoardFabError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Drill file error: {0}")]
    Excellon(#[from] ExcellonError),
    #[error("Gerber error: {0}")]
    Gerber(#[from] GerberError),
    #[error("Design rule check error: {0}")]
    Drc(#[from] DrcError),
    #[error("Pick-and-place error: {0}")]
    PickPlace(#[from] PickPlaceError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("{0}")]
    Other(String),
}

/// Write `data` to a temp file next to `path` and move it into place, so
/// readers never observe a half written file.
pub(crate) fn write_file_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Result of a design rule check with approved messages removed.
#[derive(Debug, Clone, Serialize)]
pub struct DrcReport {
    pub board: String,
    pub messages: Vec<RuleCheckMessage>,
    /// Messages hidden by an approval.
    pub approved: usize,
    pub stats: DrcStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrcStats {
    pub errors: usize,
    pub warnings: usize,
    pub hints: usize,
}

impl DrcReport {
    pub fn new(board: impl Into<String>, messages: &[RuleCheckMessage], approvals: &ApprovalSet) -> Self {
        let unapproved: Vec<RuleCheckMessage> =
            approvals.unapproved(messages).into_iter().cloned().collect();
        let stats = messages_to_stats(&unapproved);
        Self {
            board: board.into(),
            approved: messages.len() - unapproved.len(),
            messages: unapproved,
            stats,
        }
    }

    pub fn total_messages(&self) -> usize {
        self.stats.errors + self.stats.warnings + self.stats.hints
    }

    /// True if any remaining message is at least as severe as `severity`.
    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.messages.iter().any(|m| m.severity >= severity)
    }
}

fn messages_to_stats(messages: &[RuleCheckMessage]) -> DrcStats {
    let mut stats = DrcStats::default();
    for m in messages {
        match m.severity {
            Severity::Error => stats.errors += 1,
            Severity::Warning => stats.warnings += 1,
            Severity::Hint => stats.hints += 1,
        }
    }
    stats
}

/// High level operations on board snapshot files.
pub struct BoardFabCore;

impl BoardFabCore {
    pub fn load_board(path: &Path) -> Result<Board, BoardFabError> {
        let board = Board::load_json(path)?;
        tracing::debug!(
            "Loaded board '{}' from {} ({} devices, {} traces)",
            board.name,
            path.display(),
            board.devices.len(),
            board.traces.len()
        );
        Ok(board)
    }

    /// Run all enabled rules over `board`.
    pub fn run_drc(
        board: &Board,
        options: DrcOptions,
        approvals: &ApprovalSet,
    ) -> Result<DrcReport, BoardFabError> {
        let mut drc = BoardDesignRuleCheck::new(board, options);
        let mut observer = |event: DrcEvent| match event {
            DrcEvent::Status(status) => tracing::debug!("{}", status),
            DrcEvent::Progress(percent) => tracing::trace!("DRC progress {}%", percent),
            DrcEvent::Message(_) => {}
        };
        let messages = drc.execute(&mut observer)?;
        Ok(DrcReport::new(board.name.clone(), messages, approvals))
    }

    /// Load a board snapshot and check it.
    pub fn check_file(
        path: &Path,
        options: DrcOptions,
        approvals: &ApprovalSet,
    ) -> Result<DrcReport, BoardFabError> {
        let board = Self::load_board(path)?;
        Self::run_drc(&board, options, approvals)
    }

    /// Load a board snapshot and write its fabrication files into `out_dir`.
    pub fn export_file(
        path: &Path,
        settings: FabricationSettings,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BoardFabError> {
        let board = Self::load_board(path)?;
        let written = BoardFabricationExport::new(&board, settings).write_to_dir(out_dir)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drc::ApprovalKey;

    fn message(severity: Severity, rule: &'static str) -> RuleCheckMessage {
        RuleCheckMessage::new(severity, "msg", "", ApprovalKey::new(rule), vec![])
    }

    #[test]
    fn test_write_file_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_file_atomic(&path, b"first").unwrap();
        write_file_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_report_skips_approved_messages() {
        let messages = vec![
            message(Severity::Error, "copper_width"),
            message(Severity::Warning, "pth_slot_warning"),
            message(Severity::Hint, "courtyard_overlap"),
        ];
        let mut approvals = ApprovalSet::new();
        approvals.approve(&messages[0]);

        let report = DrcReport::new("demo", &messages, &approvals);
        assert_eq!(report.approved, 1);
        assert_eq!(
            report.stats,
            DrcStats {
                errors: 0,
                warnings: 1,
                hints: 1
            }
        );
        assert_eq!(report.total_messages(), 2);
        assert!(report.has_at_least(Severity::Warning));
        assert!(!report.has_at_least(Severity::Error));
    }

    #[test]
    fn test_run_drc_on_empty_board() {
        let board = Board::new("empty");
        let report = BoardFabCore::run_drc(&board, DrcOptions::default(), &ApprovalSet::new()).unwrap();
        assert_eq!(report.board, "empty");
        // only the missing outline warning
        assert_eq!(report.stats.warnings, 1);
        assert_eq!(report.stats.errors, 0);
    }
}
