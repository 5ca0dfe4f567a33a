/// The kind of a single completed test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OutcomeKind {
    Passed,
    Failed,
    Errored,
    Skipped,
    Deprecated,
}

impl OutcomeKind {
    /// Failures and errors, the outcomes worth interrupting a reader for.
    pub fn is_bad(&self) -> bool {
        matches!(self, OutcomeKind::Failed | OutcomeKind::Errored)
    }

    /// Advisory outcomes are non-fatal notices like skips and deprecations.
    pub fn is_advisory(&self) -> bool {
        matches!(self, OutcomeKind::Skipped | OutcomeKind::Deprecated)
    }
}

/// Counters for one run.
///
/// Created on `start`, written exclusively by the progress coordinator and
/// discarded with the run. The `total` is advisory: it may disagree with the
/// number of outcomes actually recorded, in which case [`ratio`](Self::ratio)
/// clamps instead of erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct RunTally {
    pub total: usize,
    pub completed: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub deprecated: usize,
}

impl RunTally {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, kind: OutcomeKind) {
        self.completed += 1;
        match kind {
            OutcomeKind::Passed => self.passed += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Errored => self.errored += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Deprecated => self.deprecated += 1,
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Passed => self.passed,
            OutcomeKind::Failed => self.failed,
            OutcomeKind::Errored => self.errored,
            OutcomeKind::Skipped => self.skipped,
            OutcomeKind::Deprecated => self.deprecated,
        }
    }

    pub fn any_bad(&self) -> bool {
        self.failed > 0 || self.errored > 0
    }

    /// Completion ratio, clamped to `[0, 1]` so a stale or wrong total
    /// degrades the display instead of breaking it.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return if self.completed == 0 { 0.0 } else { 1.0 };
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}
