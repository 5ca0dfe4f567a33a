use std::{
    env, io,
    marker::PhantomData,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::{
    console::{Console, Debugger, OutputGuard, RestoreConflict},
    outcome::{OutcomeKind, RunTally},
    progress::{ColorSetting, ProgressBar, ProgressCoordinator, ProgressHandle},
    schedule::{CountedSuite, load_counted, rebuild},
    suite::Suite,
};

/// Terminal width to fall back on when nothing better is known.
const DEFAULT_WIDTH: usize = 80;

/// Knobs for one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Bar width in display columns. `None` resolves from `COLUMNS`, then
    /// falls back to 80.
    pub width: Option<usize>,
    pub color: ColorSetting,
    /// Surface skips and deprecations in the bar's counter cluster, not just
    /// failures and errors.
    pub show_advisories: bool,
}

impl RunConfig {
    fn resolve_width(&self) -> usize {
        self.width
            .or_else(|| {
                env::var("COLUMNS")
                    .ok()
                    .and_then(|columns| columns.trim().parse().ok())
                    .filter(|&width| width > 0)
            })
            .unwrap_or(DEFAULT_WIDTH)
    }

    fn resolve_color(&self) -> bool {
        match self.color {
            ColorSetting::Always => true,
            ColorSetting::Never => false,
            ColorSetting::Automatic => atty::is(atty::Stream::Stderr),
        }
    }
}

/// Start describing a run fed by `producer`.
///
/// The producer is the host's suite-building operation. It is invoked twice
/// on [`begin`](RunSession::begin), once for counting and once for the suite
/// that actually runs, so it must be replayable; see
/// [`load_counted`](crate::schedule::load_counted).
pub fn session<Extra, Producer>(producer: Producer) -> RunSession<Extra, Producer>
where
    Producer: FnMut() -> Suite<Extra>,
{
    RunSession {
        producer,
        config: RunConfig::default(),
        console: Console::stdio(),
        _extra: PhantomData,
    }
}

/// Builder for a run: a suite producer plus console and display choices.
pub struct RunSession<Extra, Producer> {
    producer: Producer,
    config: RunConfig,
    console: Console,
    _extra: PhantomData<fn() -> Extra>,
}

impl<Extra, Producer> RunSession<Extra, Producer>
where
    Producer: FnMut() -> Suite<Extra>,
{
    pub fn with_config(self, config: RunConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_console(self, console: Console) -> Self {
        Self { console, ..self }
    }

    pub fn with_debugger(self, debugger: impl Debugger + 'static) -> Self {
        Self {
            console: self.console.with_debugger(debugger),
            ..self
        }
    }

    /// Count, reorder and go live.
    ///
    /// Counts the run, rebuilds the suite for fixture locality, paints the
    /// initial bar and displaces the console targets. The returned
    /// [`ActiveRun`] hands the rebuilt suite to the host and takes outcome
    /// notifications until [`conclude`](ActiveRun::conclude).
    pub fn begin(mut self) -> ActiveRun<Extra> {
        let started = Instant::now();
        // The host may change directories before tests run; remember where
        // the run was launched from for path display.
        let launch_dir = env::current_dir().ok();

        let CountedSuite { total, suite } = load_counted(&mut self.producer);
        let suite = rebuild(suite);

        let bar = ProgressBar::new(
            self.config.resolve_width(),
            self.config.resolve_color(),
            self.config.show_advisories,
        );
        let progress = ProgressHandle::new(ProgressCoordinator::with_shared_target(
            bar,
            self.console.err_target(),
        ));
        progress.start(total);
        let guard = OutputGuard::activate(&self.console, &progress);

        ActiveRun {
            suite: Some(suite),
            progress,
            console: self.console,
            guard: Some(guard),
            started,
            launch_dir,
        }
    }
}

/// A run in flight: rebuilt suite on one side, live bar on the other.
pub struct ActiveRun<Extra> {
    suite: Option<Suite<Extra>>,
    progress: ProgressHandle,
    console: Console,
    guard: Option<OutputGuard>,
    started: Instant,
    launch_dir: Option<PathBuf>,
}

impl<Extra> ActiveRun<Extra> {
    /// The rebuilt suite, handed over once for the host to execute.
    pub fn take_suite(&mut self) -> Option<Suite<Extra>> {
        self.suite.take()
    }

    /// Record one completed outcome.
    pub fn record(&self, kind: OutcomeKind) {
        self.progress.record(kind);
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Where the run was launched from, before any host chdir.
    pub fn launch_dir(&self) -> Option<&Path> {
        self.launch_dir.as_deref()
    }

    /// End the run: terminate the bar line, restore the console targets and
    /// summarize.
    pub fn conclude(mut self) -> RunReport {
        self.progress.finish();
        let restore_conflicts = match self.guard.take() {
            Some(guard) => guard.deactivate(),
            None => Vec::new(),
        };
        RunReport {
            tally: self.progress.tally(),
            duration: self.started.elapsed(),
            restore_conflicts,
            render_errors: self.progress.take_render_errors(),
        }
    }
}

/// What one run amounted to.
///
/// Reporting trouble is carried here instead of being raised anywhere; a
/// broken display must never change what the tests decided.
#[derive(Debug)]
#[non_exhaustive]
pub struct RunReport {
    pub tally: RunTally,
    pub duration: Duration,
    pub restore_conflicts: Vec<RestoreConflict>,
    pub render_errors: Vec<(&'static str, io::Error)>,
}

impl RunReport {
    pub fn all_good(&self) -> bool {
        !self.tally.any_bad()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::*;

    fn quiet_config() -> RunConfig {
        RunConfig {
            width: Some(40),
            color: ColorSetting::Never,
            show_advisories: false,
        }
    }

    fn leaf_names(suite: &Suite) -> Vec<String> {
        match suite {
            Suite::Test(unit) => vec![unit.name.to_string()],
            Suite::Group { children, .. } => children.iter().flat_map(|c| leaf_names(c)).collect(),
        }
    }

    #[test]
    fn a_full_run_counts_reorders_and_reports() {
        let terminal = Buffer::default();
        let console = Console::new(Buffer::default(), terminal.clone());

        let mut run = session(|| {
            group(vec![
                fixture_group(&["db"], vec![unit("t1")]),
                group(vec![unit("t2")]),
                fixture_group(&["db"], vec![unit("t3")]),
            ])
        })
        .with_config(quiet_config())
        .with_console(console)
        .begin();

        let suite = run.take_suite().expect("suite is handed over once");
        assert!(run.take_suite().is_none());
        assert_eq!(suite.leaf_count(), 3);
        // db-sharing groups end up adjacent
        assert_eq!(leaf_names(&suite), ["t1", "t3", "t2"]);

        run.record(OutcomeKind::Passed);
        run.record(OutcomeKind::Failed);
        run.record(OutcomeKind::Passed);

        let report = run.conclude();
        assert_eq!(report.tally.total, 3);
        assert_eq!(report.tally.completed, 3);
        assert_eq!(report.tally.failed, 1);
        assert!(!report.all_good());
        assert!(report.restore_conflicts.is_empty());
        assert!(report.render_errors.is_empty());

        let raw = terminal.contents();
        assert!(raw.contains("3/3"), "{raw:?}");
        assert!(raw.ends_with('\n'), "{raw:?}");
    }

    #[test]
    fn client_writes_during_the_run_keep_the_bar_intact() {
        let terminal = Buffer::default();
        let console = Console::new(Buffer::default(), terminal.clone());

        let run = session(|| group(vec![unit("t1"), unit("t2")]))
            .with_config(quiet_config())
            .with_console(console.clone())
            .begin();

        run.record(OutcomeKind::Passed);
        console.write_err(b"some test chatter\n").unwrap();
        run.record(OutcomeKind::Passed);
        let report = run.conclude();
        assert_eq!(report.tally.passed, 2);

        let raw = terminal.contents();
        let chatter = raw.find("some test chatter\n").expect("chatter forwarded");
        let last_bar = raw.rfind("2/2").expect("bar painted after");
        assert!(chatter < last_bar, "{raw:?}");
    }

    #[test]
    fn console_targets_are_back_after_conclude() {
        let out = Buffer::default();
        let console = Console::new(out.clone(), Buffer::default());

        let run = session(|| unit("only"))
            .with_config(quiet_config())
            .with_console(console.clone())
            .begin();
        run.record(OutcomeKind::Passed);
        run.conclude();

        console.write_out(b"plain again\n").unwrap();
        assert_eq!(out.contents(), "plain again\n");
    }

    #[test]
    fn launch_dir_is_captured() {
        let run = session(|| unit("only"))
            .with_config(quiet_config())
            .with_console(Console::new(Buffer::default(), Buffer::default()))
            .begin();
        assert_eq!(run.launch_dir(), env::current_dir().ok().as_deref());
        run.conclude();
    }
}
