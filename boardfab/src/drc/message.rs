//! Rule check messages and their approval keys.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Layer;
use crate::geometry::Path;
use crate::BoardFabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A board item taking part in a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ItemRef {
    Trace { trace: Uuid },
    Via { via: Uuid },
    Pad { device: Uuid, pad: Uuid },
    PadHole { device: Uuid, pad: Uuid, hole: Uuid },
    Plane { plane: Uuid },
    Polygon { polygon: Uuid },
    Hole { hole: Uuid },
    DeviceHole { device: Uuid, hole: Uuid },
    Device { device: Uuid },
}

impl ItemRef {
    pub(crate) fn to_sexpr(self) -> String {
        match self {
            ItemRef::Trace { trace } => format!("(trace {})", trace),
            ItemRef::Via { via } => format!("(via {})", via),
            ItemRef::Pad { device, pad } => format!("(pad {} {})", device, pad),
            ItemRef::PadHole { device, pad, hole } => {
                format!("(pad_hole {} {} {})", device, pad, hole)
            }
            ItemRef::Plane { plane } => format!("(plane {})", plane),
            ItemRef::Polygon { polygon } => format!("(polygon {})", polygon),
            ItemRef::Hole { hole } => format!("(hole {})", hole),
            ItemRef::DeviceHole { device, hole } => format!("(device_hole {} {})", device, hole),
            ItemRef::Device { device } => format!("(device {})", device),
        }
    }
}

/// Stable identity of a violation: the rule plus the items involved.
///
/// Items are sorted when rendered, so the key does not depend on the order
/// in which a rule happened to visit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalKey {
    rule: &'static str,
    items: Vec<String>,
}

impl ApprovalKey {
    pub fn new(rule: &'static str) -> Self {
        Self {
            rule,
            items: Vec::new(),
        }
    }

    pub fn item(mut self, item: ItemRef) -> Self {
        self.items.push(item.to_sexpr());
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.items.push(format!("(layer {})", layer.name()));
        self
    }
}

impl fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items = self.items.clone();
        items.sort();
        write!(f, "(approved {}", self.rule)?;
        for item in items {
            write!(f, " {}", item)?;
        }
        write!(f, ")")
    }
}

/// A single finding of a design rule check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckMessage {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub description: String,
    pub approval: String,
    /// Outlines to highlight, in board coordinates.
    #[serde(default)]
    pub locations: Vec<Path>,
}

impl RuleCheckMessage {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        description: impl Into<String>,
        approval: ApprovalKey,
        locations: Vec<Path>,
    ) -> Self {
        Self {
            rule_id: approval.rule.to_string(),
            severity,
            message: message.into(),
            description: description.into(),
            approval: approval.to_string(),
            locations,
        }
    }
}

/// Approval keys the user has accepted, persisted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalSet {
    approved: BTreeSet<String>,
}

impl ApprovalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&mut self, message: &RuleCheckMessage) {
        self.approved.insert(message.approval.clone());
    }

    pub fn revoke(&mut self, message: &RuleCheckMessage) {
        self.approved.remove(&message.approval);
    }

    pub fn is_approved(&self, message: &RuleCheckMessage) -> bool {
        self.approved.contains(&message.approval)
    }

    pub fn len(&self) -> usize {
        self.approved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approved.is_empty()
    }

    /// Messages not covered by an approval, in their original order.
    pub fn unapproved<'a>(&self, messages: &'a [RuleCheckMessage]) -> Vec<&'a RuleCheckMessage> {
        messages.iter().filter(|m| !self.is_approved(m)).collect()
    }

    /// Drop approvals that no longer match any message.
    pub fn retain_matching(&mut self, messages: &[RuleCheckMessage]) {
        let current: BTreeSet<&str> = messages.iter().map(|m| m.approval.as_str()).collect();
        self.approved.retain(|key| current.contains(key.as_str()));
    }

    pub fn load_json(path: &FsPath) -> Result<Self, BoardFabError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| BoardFabError::Parse(e.to_string()))
    }

    pub fn save_json(&self, path: &FsPath) -> Result<(), BoardFabError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BoardFabError::Other(e.to_string()))?;
        crate::core::write_file_atomic(path, json.as_bytes())?;
        Ok(())
    }
}
