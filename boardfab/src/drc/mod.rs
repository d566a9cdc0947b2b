//! Design rule check
//!
//! [`BoardDesignRuleCheck`] runs the rule catalogue of a [`RulesEngine`]
//! over a board snapshot, one rule after another. Progress, status texts
//! and every violation are reported to a [`DrcObserver`] as they happen,
//! so a caller running the check on a worker thread can forward them to a
//! UI without waiting for the whole run.
//!
//! ```no_run
//! use boardfab::board::Board;
//! use boardfab::drc::{BoardDesignRuleCheck, DrcEvent, DrcOptions};
//! use std::path::Path;
//!
//! let board = Board::load_json(Path::new("board.json")).unwrap();
//! let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
//! let mut observer = |event: DrcEvent| {
//!     if let DrcEvent::Progress(percent) = event {
//!         eprintln!("{}%", percent);
//!     }
//! };
//! for message in drc.execute(&mut observer).unwrap() {
//!     println!("{}: {}", message.severity, message.message);
//! }
//! ```

pub mod connectivity;
pub mod items;
pub mod message;
pub mod options;
pub mod rules;

pub use message::{ApprovalKey, ApprovalSet, ItemRef, RuleCheckMessage, Severity};
pub use options::{DrcOptions, SlotWarningLevel};
pub use rules::{Rule, RulesEngine};

use std::borrow::Cow;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::board::{Board, Plane};
use crate::geometry::Path;
use items::{copper_items, hole_items, CopperItem, HoleItem};

#[derive(Debug, Error)]
pub enum DrcError {
    #[error("design rule check has already been executed")]
    AlreadyExecuted,
    #[error("design rule check cancelled")]
    Cancelled,
    #[error("failed to rebuild plane {plane}: {reason}")]
    PlaneRebuild { plane: Uuid, reason: String },
    #[error("rule '{rule}' failed: {reason}")]
    Rule { rule: String, reason: String },
    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

/// Notification emitted while a check runs.
#[derive(Debug, Clone, PartialEq)]
pub enum DrcEvent {
    /// Overall progress in percent, never decreasing.
    Progress(u8),
    /// Description of the phase now running.
    Status(String),
    /// A violation, reported as soon as it is found.
    Message(RuleCheckMessage),
}

pub trait DrcObserver {
    fn on_event(&mut self, event: DrcEvent);
}

impl<F: FnMut(DrcEvent)> DrcObserver for F {
    fn on_event(&mut self, event: DrcEvent) {
        self(event)
    }
}

impl DrcObserver for mpsc::Sender<DrcEvent> {
    fn on_event(&mut self, event: DrcEvent) {
        // a dropped receiver only means nobody is listening anymore
        let _ = self.send(event);
    }
}

/// Computes the copper fragments of a plane.
pub trait PlaneFiller {
    fn fill(
        &mut self,
        board: &Board,
        plane: &Plane,
    ) -> Result<Vec<Path>, Box<dyn StdError + Send + Sync>>;
}

impl<F> PlaneFiller for F
where
    F: FnMut(&Board, &Plane) -> Result<Vec<Path>, Box<dyn StdError + Send + Sync>>,
{
    fn fill(
        &mut self,
        board: &Board,
        plane: &Plane,
    ) -> Result<Vec<Path>, Box<dyn StdError + Send + Sync>> {
        self(board, plane)
    }
}

/// Collects the messages of a run and forwards events to the observer.
///
/// Messages with an approval key that was already reported are dropped.
pub struct MessageSink<'a> {
    observer: &'a mut dyn DrcObserver,
    messages: Vec<RuleCheckMessage>,
    seen: HashSet<String>,
    progress: Option<u8>,
}

impl<'a> MessageSink<'a> {
    pub fn new(observer: &'a mut dyn DrcObserver) -> Self {
        Self {
            observer,
            messages: Vec::new(),
            seen: HashSet::new(),
            progress: None,
        }
    }

    pub fn emit(&mut self, message: RuleCheckMessage) {
        if !self.seen.insert(message.approval.clone()) {
            return;
        }
        self.observer.on_event(DrcEvent::Message(message.clone()));
        self.messages.push(message);
    }

    fn status(&mut self, text: &str) {
        self.observer.on_event(DrcEvent::Status(text.to_string()));
    }

    fn progress(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.progress.unwrap_or(0));
        if self.progress != Some(percent) {
            self.progress = Some(percent);
            self.observer.on_event(DrcEvent::Progress(percent));
        }
    }

    pub fn messages(&self) -> &[RuleCheckMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<RuleCheckMessage> {
        self.messages
    }
}

/// Board geometry prepared once per run and shared by all rules.
pub struct RuleContext<'a> {
    pub board: &'a Board,
    pub options: &'a DrcOptions,
    pub copper: Vec<CopperItem>,
    pub holes: Vec<HoleItem>,
}

impl<'a> RuleContext<'a> {
    pub fn new(board: &'a Board, options: &'a DrcOptions) -> Result<Self, DrcError> {
        Ok(Self {
            board,
            options,
            copper: copper_items(board)?,
            holes: hole_items(board)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrcState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// A single design rule check run over one board.
pub struct BoardDesignRuleCheck<'a> {
    board: &'a Board,
    options: DrcOptions,
    rules: RulesEngine,
    plane_filler: Option<Box<dyn PlaneFiller + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
    state: DrcState,
    messages: Vec<RuleCheckMessage>,
}

impl<'a> BoardDesignRuleCheck<'a> {
    pub fn new(board: &'a Board, options: DrcOptions) -> Self {
        Self {
            board,
            options,
            rules: RulesEngine::with_default_rules(),
            plane_filler: None,
            cancel: None,
            state: DrcState::Idle,
            messages: Vec::new(),
        }
    }

    /// Replace the rule catalogue.
    pub fn with_rules(mut self, rules: RulesEngine) -> Self {
        self.rules = rules;
        self
    }

    /// Used to recompute plane fragments when `rebuild_planes` is set.
    /// Without a filler the fragments of the snapshot are checked as they are.
    pub fn with_plane_filler(mut self, filler: impl PlaneFiller + 'a) -> Self {
        self.plane_filler = Some(Box::new(filler));
        self
    }

    /// The flag is polled before every rule; once set the run fails with
    /// [`DrcError::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DrcState {
        self.state
    }

    pub fn options(&self) -> &DrcOptions {
        &self.options
    }

    /// Messages of a completed run, empty otherwise.
    pub fn messages(&self) -> &[RuleCheckMessage] {
        &self.messages
    }

    /// Run all enabled rules. Can be called only once per instance.
    pub fn execute(
        &mut self,
        observer: &mut dyn DrcObserver,
    ) -> Result<&[RuleCheckMessage], DrcError> {
        if self.state != DrcState::Idle {
            return Err(DrcError::AlreadyExecuted);
        }
        self.state = DrcState::Running;

        match self.run(observer) {
            Ok(messages) => {
                self.messages = messages;
                self.state = DrcState::Completed;
                Ok(&self.messages)
            }
            Err(e) => {
                tracing::warn!("Design rule check failed: {}", e);
                self.state = DrcState::Failed;
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), DrcError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(DrcError::Cancelled),
            _ => Ok(()),
        }
    }

    fn rebuild_planes(&mut self) -> Result<Option<Board>, DrcError> {
        let Some(filler) = self.plane_filler.as_mut() else {
            tracing::debug!("No plane filler configured, checking existing plane fragments");
            return Ok(None);
        };
        let mut board = self.board.clone();
        for plane in &mut board.planes {
            plane.fragments =
                filler
                    .fill(self.board, plane)
                    .map_err(|e| DrcError::PlaneRebuild {
                        plane: plane.uuid,
                        reason: e.to_string(),
                    })?;
        }
        Ok(Some(board))
    }

    fn run(&mut self, observer: &mut dyn DrcObserver) -> Result<Vec<RuleCheckMessage>, DrcError> {
        let started = Instant::now();
        tracing::info!("Running design rule check on board '{}'", self.board.name);

        let rules: Vec<Arc<dyn Rule>> = self
            .rules
            .rules()
            .iter()
            .filter(|r| r.enabled(&self.options))
            .cloned()
            .collect();
        let rebuild = self.options.rebuild_planes;
        let steps = rules.len() + usize::from(rebuild);
        let percent = |done: usize| (done * 100 / steps.max(1)) as u8;

        let mut sink = MessageSink::new(observer);
        sink.progress(0);

        let mut done = 0;
        let board = if rebuild {
            self.check_cancelled()?;
            sink.status("Rebuilding planes...");
            let rebuilt = self.rebuild_planes()?;
            done += 1;
            sink.progress(percent(done));
            match rebuilt {
                Some(board) => Cow::Owned(board),
                None => Cow::Borrowed(self.board),
            }
        } else {
            Cow::Borrowed(self.board)
        };

        let ctx = RuleContext::new(&board, &self.options)?;
        for rule in &rules {
            self.check_cancelled()?;
            sink.status(rule.name());
            let before = sink.messages().len();
            rule.check(&ctx, &mut sink)?;
            tracing::debug!(
                "Rule '{}' reported {} messages",
                rule.id(),
                sink.messages().len() - before
            );
            done += 1;
            sink.progress(percent(done));
        }
        sink.progress(100);

        let messages = sink.into_messages();
        tracing::info!(
            "Design rule check finished with {} messages in {:?}",
            messages.len(),
            started.elapsed()
        );
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Layer, Net, Trace};
    use crate::geometry::{Point, PositiveLength, UnsignedLength};

    fn trace(net: Option<Uuid>, start: Point, end: Point) -> Trace {
        Trace {
            uuid: Uuid::new_v4(),
            net,
            layer: Layer::TopCopper,
            start,
            end,
            width: PositiveLength::from_mm(0.15).unwrap(),
            start_anchor: None,
            end_anchor: None,
        }
    }

    fn test_board() -> Board {
        let mut board = Board::new("test");
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        board.nets.push(Net { uuid: a, name: "A".into() });
        board.nets.push(Net { uuid: b, name: "B".into() });
        board.outlines.push(Path::polygon(&[
            Point::from_mm(-20.0, -20.0),
            Point::from_mm(20.0, -20.0),
            Point::from_mm(20.0, 20.0),
            Point::from_mm(-20.0, 20.0),
            Point::from_mm(-20.0, -20.0),
        ]));
        board.traces.push(trace(Some(a), Point::origin(), Point::from_mm(10.0, 0.0)));
        board.traces.push(trace(Some(b), Point::from_mm(0.0, 0.25), Point::from_mm(10.0, 0.25)));
        board.planes.push(Plane {
            uuid: Uuid::new_v4(),
            net: a,
            layer: Layer::BottomCopper,
            outline: Path::polygon(&[
                Point::from_mm(-10.0, -10.0),
                Point::from_mm(10.0, -10.0),
                Point::from_mm(10.0, 10.0),
                Point::from_mm(-10.0, 10.0),
            ]),
            min_width: UnsignedLength::from_mm(0.2).unwrap(),
            min_clearance: UnsignedLength::from_mm(0.3).unwrap(),
            fragments: vec![],
        });
        board
    }

    fn collect(drc: &mut BoardDesignRuleCheck<'_>) -> (Result<Vec<RuleCheckMessage>, DrcError>, Vec<DrcEvent>) {
        let mut events = Vec::new();
        let mut observer = |e: DrcEvent| events.push(e);
        let result = drc.execute(&mut observer).map(|m| m.to_vec());
        (result, events)
    }

    #[test]
    fn test_events_and_state() {
        let board = test_board();
        let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
        assert_eq!(drc.state(), DrcState::Idle);
        let (result, events) = collect(&mut drc);
        let messages = result.unwrap();
        assert_eq!(drc.state(), DrcState::Completed);

        // two traces of width 0.15 and their 0.1 clearance
        let rules: Vec<&str> = messages.iter().map(|m| m.rule_id.as_str()).collect();
        assert_eq!(rules, vec!["copper_width", "copper_width", "copper_clearance"]);

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                DrcEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] < w[1]));

        let statuses: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                DrcEvent::Status(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(statuses[0], "Rebuilding planes...");
        assert_eq!(statuses[1], "Checking copper widths...");
        assert_eq!(statuses.len(), 1 + RulesEngine::with_default_rules().len());

        let reported: Vec<RuleCheckMessage> = events
            .into_iter()
            .filter_map(|e| match e {
                DrcEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(reported, messages);
    }

    #[test]
    fn test_execute_only_once() {
        let board = test_board();
        let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
        let mut observer = |_: DrcEvent| {};
        assert!(drc.execute(&mut observer).is_ok());
        assert!(matches!(drc.execute(&mut observer), Err(DrcError::AlreadyExecuted)));
        assert_eq!(drc.messages().len(), 3);
    }

    #[test]
    fn test_approval_keys_are_stable() {
        let board = test_board();
        let run = || {
            let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
            let mut observer = |_: DrcEvent| {};
            drc.execute(&mut observer)
                .unwrap()
                .iter()
                .map(|m| m.approval.clone())
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());

        // unrelated geometry does not change the keys of existing violations
        let mut changed = board.clone();
        changed.traces.push(trace(None, Point::from_mm(-15.0, -15.0), Point::from_mm(-15.0, -5.0)));
        let mut drc = BoardDesignRuleCheck::new(&changed, DrcOptions::default());
        let mut observer = |_: DrcEvent| {};
        let keys: Vec<String> = drc
            .execute(&mut observer)
            .unwrap()
            .iter()
            .map(|m| m.approval.clone())
            .collect();
        assert!(first.iter().all(|k| keys.contains(k)));
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let board = test_board();
        let mut options = DrcOptions::default();
        options.check_copper_width = false;
        options.rebuild_planes = false;
        let mut drc = BoardDesignRuleCheck::new(&board, options);
        let (result, events) = collect(&mut drc);
        assert_eq!(result.unwrap().len(), 1);
        let skipped = ["Checking copper widths...", "Rebuilding planes..."];
        assert!(!events
            .iter()
            .any(|e| matches!(e, DrcEvent::Status(s) if skipped.contains(&s.as_str()))));
    }

    #[test]
    fn test_cancel_between_rules() {
        let board = test_board();
        let flag = Arc::new(AtomicBool::new(false));
        let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default())
            .with_cancel_flag(flag.clone());
        let mut statuses = 0;
        let mut observer = |e: DrcEvent| {
            if let DrcEvent::Status(_) = e {
                statuses += 1;
                flag.store(true, Ordering::Relaxed);
            }
        };
        assert!(matches!(drc.execute(&mut observer), Err(DrcError::Cancelled)));
        assert_eq!(statuses, 1);
        assert_eq!(drc.state(), DrcState::Failed);
        assert!(drc.messages().is_empty());
    }

    #[test]
    fn test_plane_filler() {
        let board = test_board();
        let mut filled = 0;
        let filler = |_: &Board, plane: &Plane| -> Result<Vec<Path>, Box<dyn StdError + Send + Sync>> {
            filled += 1;
            Ok(vec![plane.outline.clone()])
        };
        let mut options = DrcOptions::default();
        options.check_copper_width = false;
        // the rebuilt plane fragment on the bottom layer does not touch the top traces
        let mut drc = BoardDesignRuleCheck::new(&board, options).with_plane_filler(filler);
        let mut observer = |_: DrcEvent| {};
        assert_eq!(drc.execute(&mut observer).unwrap().len(), 1);
        drop(drc);
        assert_eq!(filled, 1);
    }

    #[test]
    fn test_plane_filler_failure() {
        let board = test_board();
        let filler = |_: &Board, _: &Plane| -> Result<Vec<Path>, Box<dyn StdError + Send + Sync>> {
            Err("out of memory".into())
        };
        let mut drc =
            BoardDesignRuleCheck::new(&board, DrcOptions::default()).with_plane_filler(filler);
        let mut observer = |_: DrcEvent| {};
        let err = drc.execute(&mut observer).unwrap_err();
        assert!(matches!(err, DrcError::PlaneRebuild { .. }));
        assert!(err.to_string().contains("out of memory"));
        assert_eq!(drc.state(), DrcState::Failed);
    }

    #[test]
    fn test_channel_observer() {
        let board = test_board();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let mut tx = tx;
            let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default());
            drc.execute(&mut tx).map(|m| m.len()).unwrap()
        });
        let events: Vec<DrcEvent> = rx.iter().collect();
        assert_eq!(handle.join().unwrap(), 3);
        assert_eq!(events.last(), Some(&DrcEvent::Progress(100)));
    }

    #[test]
    fn test_sink_drops_duplicate_keys() {
        let mut count = 0;
        let mut observer = |_: DrcEvent| count += 1;
        let mut sink = MessageSink::new(&mut observer);
        let key = || ApprovalKey::new("copper_width").item(ItemRef::Trace { trace: Uuid::nil() });
        sink.emit(RuleCheckMessage::new(Severity::Error, "a", "", key(), vec![]));
        sink.emit(RuleCheckMessage::new(Severity::Error, "a", "", key(), vec![]));
        assert_eq!(sink.into_messages().len(), 1);
        assert_eq!(count, 1);
    }
}
