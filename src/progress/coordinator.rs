use std::{cell::RefCell, io, rc::Rc};

use tracing::{debug, warn};

use crate::outcome::{OutcomeKind, RunTally};

use super::ProgressBar;

/// A writer slot shared within the single-threaded run.
pub type SharedWrite = Rc<RefCell<dyn io::Write>>;

/// Where the run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Suspended,
    Finished,
}

/// Erase the current line and park the cursor at column zero.
const ERASE_LINE: &[u8] = b"\r\x1b[2K";

/// Owns the run tally and the one line of terminal the bar lives on.
///
/// The coordinator is the single writer of its [`RunTally`]. It repaints the
/// line on every recorded outcome and hides it while suspended. Suspension is
/// a depth, not a flag: a debugger entered from within an already suspended
/// debugger session nests cleanly, and the bar reappears only when the last
/// suspension lifts. Write failures degrade reporting, never the run; they
/// are collected and surfaced in the final report.
pub struct ProgressCoordinator {
    bar: ProgressBar,
    target: SharedWrite,
    tally: RunTally,
    phase: RunPhase,
    suspend_depth: usize,
    last_line: String,
    painted: bool,
    active: bool,
    overshoot_warned: bool,
    render_errors: Vec<(&'static str, io::Error)>,
}

impl ProgressCoordinator {
    pub fn new(bar: ProgressBar, target: impl io::Write + 'static) -> Self {
        Self::with_shared_target(bar, Rc::new(RefCell::new(target)))
    }

    pub fn with_shared_target(bar: ProgressBar, target: SharedWrite) -> Self {
        Self {
            bar,
            target,
            tally: RunTally::default(),
            phase: RunPhase::Idle,
            suspend_depth: 0,
            last_line: String::new(),
            painted: false,
            active: false,
            overshoot_warned: false,
            render_errors: Vec::new(),
        }
    }

    pub fn tally(&self) -> &RunTally {
        &self.tally
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn suspend_depth(&self) -> usize {
        self.suspend_depth
    }

    /// Begin a run of `total` units and paint the initial bar.
    pub fn start(&mut self, total: usize) {
        self.tally = RunTally::new(total);
        self.phase = RunPhase::Running;
        self.active = true;
        self.overshoot_warned = false;
        self.repaint();
    }

    /// Count one outcome and repaint.
    ///
    /// Recording past the advertised total is tolerated; the ratio clamps
    /// and the mismatch is logged once.
    pub fn record(&mut self, kind: OutcomeKind) {
        self.tally.record(kind);
        if self.tally.completed > self.tally.total && !self.overshoot_warned {
            self.overshoot_warned = true;
            warn!(
                total = self.tally.total,
                completed = self.tally.completed,
                "more outcomes than the counted total, display ratio is clamped"
            );
        }
        if self.tally.total > 0
            && self.tally.completed >= self.tally.total
            && self.phase == RunPhase::Running
        {
            self.phase = RunPhase::Finished;
        }
        self.repaint();
    }

    /// Hide the bar until a matching [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        self.suspend_depth += 1;
        if self.suspend_depth == 1 {
            self.erase();
            if self.phase == RunPhase::Running {
                self.phase = RunPhase::Suspended;
            }
        }
    }

    /// Lift one suspension. When the last one lifts, the previously painted
    /// line is restored byte for byte.
    pub fn resume(&mut self) {
        if self.suspend_depth == 0 {
            debug!("resume without matching suspend, ignoring");
            return;
        }
        self.suspend_depth -= 1;
        if self.suspend_depth > 0 {
            return;
        }
        if self.phase == RunPhase::Suspended {
            self.phase = RunPhase::Running;
        }
        if self.active && !self.last_line.is_empty() {
            let line = self.last_line.clone();
            self.paint("resume", &line);
        }
    }

    /// End the bar's lifecycle, terminating its line. Idempotent.
    pub fn finish(&mut self) {
        if self.painted {
            self.write_target("finish", b"\n");
            self.painted = false;
        }
        self.phase = RunPhase::Finished;
        self.active = false;
    }

    pub(crate) fn take_render_errors(&mut self) -> Vec<(&'static str, io::Error)> {
        std::mem::take(&mut self.render_errors)
    }

    fn repaint(&mut self) {
        // Keep the cached line current even while hidden, so the next
        // resume restores the state the run is actually in.
        self.last_line = self.bar.render(&self.tally);
        if !self.active || self.suspend_depth > 0 {
            return;
        }
        let line = self.last_line.clone();
        self.paint("repaint", &line);
    }

    fn erase(&mut self) {
        if self.painted {
            self.write_target("erase", ERASE_LINE);
            self.painted = false;
        }
    }

    fn paint(&mut self, op: &'static str, line: &str) {
        let mut bytes = Vec::with_capacity(ERASE_LINE.len() + line.len());
        bytes.extend_from_slice(ERASE_LINE);
        bytes.extend_from_slice(line.as_bytes());
        self.write_target(op, &bytes);
        self.painted = true;
    }

    fn write_target(&mut self, op: &'static str, bytes: &[u8]) {
        let target = Rc::clone(&self.target);
        let mut target = target.borrow_mut();
        let outcome = target.write_all(bytes).and_then(|()| target.flush());
        if let Err(err) = outcome {
            self.render_errors.push((op, err));
        }
    }
}

/// Cloneable handle to the run's single [`ProgressCoordinator`].
///
/// The run is single-threaded and cooperative, so shared access is plain
/// reference counting. Borrows are taken only for the duration of one call,
/// which keeps nested suspensions and re-entrant debugger hooks safe.
#[derive(Clone)]
pub struct ProgressHandle(Rc<RefCell<ProgressCoordinator>>);

impl ProgressHandle {
    pub fn new(coordinator: ProgressCoordinator) -> Self {
        Self(Rc::new(RefCell::new(coordinator)))
    }

    pub fn start(&self, total: usize) {
        self.0.borrow_mut().start(total);
    }

    pub fn record(&self, kind: OutcomeKind) {
        self.0.borrow_mut().record(kind);
    }

    pub fn suspend(&self) {
        self.0.borrow_mut().suspend();
    }

    pub fn resume(&self) {
        self.0.borrow_mut().resume();
    }

    /// Suspend until the returned guard drops, however the scope exits.
    pub fn suspend_scope(&self) -> SuspendGuard<'_> {
        self.suspend();
        SuspendGuard(self)
    }

    pub fn finish(&self) {
        self.0.borrow_mut().finish();
    }

    pub fn tally(&self) -> RunTally {
        self.0.borrow().tally().clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.0.borrow().phase()
    }

    pub fn suspend_depth(&self) -> usize {
        self.0.borrow().suspend_depth()
    }

    pub(crate) fn take_render_errors(&self) -> Vec<(&'static str, io::Error)> {
        self.0.borrow_mut().take_render_errors()
    }
}

/// Lifts its suspension on drop, so early exits cannot leave the bar hidden.
pub struct SuspendGuard<'a>(&'a ProgressHandle);

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.0.resume();
    }
}
