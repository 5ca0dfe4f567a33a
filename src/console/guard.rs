use std::{cell::RefCell, fmt, io, rc::Rc};

use tracing::warn;

use crate::progress::{ProgressHandle, SharedWrite};

use super::{Console, ConsoleHook};

/// Which console slot a restoration conflict was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Out,
    Err,
    BreakHook,
    CommandLoop,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::Out => "out",
            SlotKind::Err => "err",
            SlotKind::BreakHook => "break hook",
            SlotKind::CommandLoop => "command loop",
        };
        f.write_str(name)
    }
}

/// A console slot no longer held what an activation installed when that
/// activation restored it.
///
/// The saved target is put back anyway; the conflict only means some other
/// party replaced the slot and never cleaned up. Reporting trouble must not
/// fail an otherwise successful run, so this is surfaced, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("console {slot} slot changed behind an active guard; the saved target was restored anyway")]
pub struct RestoreConflict {
    pub slot: SlotKind,
}

/// Forwards writes to the displaced target with the bar hidden.
///
/// Client output then appears on its own lines above the bar, and the bar is
/// repainted right after, current and intact.
struct BarAwareWriter {
    inner: SharedWrite,
    progress: ProgressHandle,
}

impl io::Write for BarAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _hidden = self.progress.suspend_scope();
        self.inner.borrow_mut().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.borrow_mut().flush()
    }
}

/// Wrap a debugger hook so the bar disappears before the user's first
/// exchange and reappears when the session ends, however it ends.
fn suspending_hook(progress: &ProgressHandle, displaced: &ConsoleHook) -> ConsoleHook {
    let progress = progress.clone();
    let displaced = Rc::clone(displaced);
    Rc::new(move || {
        let _hidden = progress.suspend_scope();
        displaced();
    })
}

/// Displaces all four console slots for the duration of one activation.
///
/// Activation saves whatever is currently installed and installs
/// interceptors. Deactivation restores exactly the saved targets; each
/// activation only ever touches what it displaced itself, so a run-level
/// activation and nested per-test activations compose as long as they unwind
/// LIFO. Dropping the guard restores too, so non-local exits cannot leave
/// interceptors behind.
pub struct OutputGuard {
    console: Console,
    saved_out: SharedWrite,
    saved_err: SharedWrite,
    saved_break: ConsoleHook,
    saved_loop: ConsoleHook,
    witness_out: SharedWrite,
    witness_err: SharedWrite,
    witness_break: ConsoleHook,
    witness_loop: ConsoleHook,
    restored: bool,
}

impl OutputGuard {
    pub fn activate(console: &Console, progress: &ProgressHandle) -> Self {
        let saved_out = console.out_target();
        let witness_out: SharedWrite = Rc::new(RefCell::new(BarAwareWriter {
            inner: Rc::clone(&saved_out),
            progress: progress.clone(),
        }));
        console.replace_out(Rc::clone(&witness_out));

        let saved_err = console.err_target();
        let witness_err: SharedWrite = Rc::new(RefCell::new(BarAwareWriter {
            inner: Rc::clone(&saved_err),
            progress: progress.clone(),
        }));
        console.replace_err(Rc::clone(&witness_err));

        let saved_break = console.break_hook();
        let witness_break = suspending_hook(progress, &saved_break);
        console.replace_break(Rc::clone(&witness_break));

        let saved_loop = console.command_loop_hook();
        let witness_loop = suspending_hook(progress, &saved_loop);
        console.replace_command_loop(Rc::clone(&witness_loop));

        Self {
            console: console.clone(),
            saved_out,
            saved_err,
            saved_break,
            saved_loop,
            witness_out,
            witness_err,
            witness_break,
            witness_loop,
            restored: false,
        }
    }

    /// Restore the displaced targets and report any conflicts found.
    pub fn deactivate(mut self) -> Vec<RestoreConflict> {
        self.restore()
    }

    fn restore(&mut self) -> Vec<RestoreConflict> {
        if self.restored {
            return Vec::new();
        }
        self.restored = true;

        let mut conflicts = Vec::new();
        let mut found = |slot: SlotKind, intact: bool| {
            if intact {
                return;
            }
            warn!(slot = %slot, "restoring a console slot someone else replaced");
            conflicts.push(RestoreConflict { slot });
        };

        let current = self.console.replace_out(Rc::clone(&self.saved_out));
        found(SlotKind::Out, Rc::ptr_eq(&current, &self.witness_out));
        let current = self.console.replace_err(Rc::clone(&self.saved_err));
        found(SlotKind::Err, Rc::ptr_eq(&current, &self.witness_err));
        let current = self.console.replace_break(Rc::clone(&self.saved_break));
        found(SlotKind::BreakHook, Rc::ptr_eq(&current, &self.witness_break));
        let current = self
            .console
            .replace_command_loop(Rc::clone(&self.saved_loop));
        found(SlotKind::CommandLoop, Rc::ptr_eq(&current, &self.witness_loop));

        conflicts
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        console::Debugger,
        outcome::OutcomeKind,
        progress::{ProgressBar, ProgressCoordinator},
        test_support::Buffer,
    };

    fn bar_progress(target: &Buffer) -> ProgressHandle {
        ProgressHandle::new(ProgressCoordinator::new(
            ProgressBar::new(30, false, false),
            target.clone(),
        ))
    }

    #[test]
    fn client_output_lands_above_a_repainted_bar() {
        let terminal = Buffer::default();
        let console = Console::new(Buffer::default(), terminal.clone());
        let progress = bar_progress(&terminal);
        progress.start(2);
        progress.record(OutcomeKind::Passed);

        let guard = OutputGuard::activate(&console, &progress);
        console.write_err(b"diagnostic\n").unwrap();
        assert!(guard.deactivate().is_empty());

        let raw = terminal.contents();
        let diagnostic = raw.find("diagnostic\n").expect("forwarded write");
        let repaint = raw.rfind("1/2").expect("bar repainted");
        assert!(diagnostic < repaint, "{raw:?}");
    }

    #[test]
    fn deactivation_restores_the_exact_targets() {
        let out = Buffer::default();
        let console = Console::new(out.clone(), Buffer::default());
        let progress = bar_progress(&Buffer::default());

        let guard = OutputGuard::activate(&console, &progress);
        assert!(guard.deactivate().is_empty());

        console.write_out(b"direct\n").unwrap();
        assert_eq!(out.contents(), "direct\n");
    }

    #[test]
    fn nested_activations_unwind_lifo() {
        let out = Buffer::default();
        let console = Console::new(out.clone(), Buffer::default());
        let progress = bar_progress(&Buffer::default());

        let outer = OutputGuard::activate(&console, &progress);
        let inner = OutputGuard::activate(&console, &progress);
        assert!(inner.deactivate().is_empty());
        assert!(outer.deactivate().is_empty());

        console.write_out(b"after\n").unwrap();
        assert_eq!(out.contents(), "after\n");
    }

    #[test]
    fn foreign_replacement_is_a_logged_conflict_not_an_error() {
        let console = Console::new(Buffer::default(), Buffer::default());
        let progress = bar_progress(&Buffer::default());

        let guard = OutputGuard::activate(&console, &progress);
        let foreign = Buffer::default();
        console.replace_out(Rc::new(RefCell::new(foreign)));

        let conflicts = guard.deactivate();
        assert_eq!(conflicts, vec![RestoreConflict { slot: SlotKind::Out }]);
    }

    #[test]
    fn debugger_session_hides_the_bar_until_it_ends() {
        struct Probing {
            progress: ProgressHandle,
            depth_seen: Rc<Cell<usize>>,
        }
        impl Debugger for Probing {
            fn enter_break(&self) {
                self.depth_seen.set(self.progress.suspend_depth());
            }
            fn command_loop(&self) {}
        }

        let terminal = Buffer::default();
        let console = Console::new(Buffer::default(), terminal.clone());
        let progress = bar_progress(&terminal);
        let depth_seen = Rc::new(Cell::new(0));

        let console = console.with_debugger(Probing {
            progress: progress.clone(),
            depth_seen: Rc::clone(&depth_seen),
        });
        progress.start(1);

        let guard = OutputGuard::activate(&console, &progress);
        console.enter_break();
        assert_eq!(depth_seen.get(), 1);
        assert_eq!(progress.suspend_depth(), 0);
        drop(guard);
    }

    #[test]
    fn nested_debugger_sessions_balance_to_zero() {
        struct Recursing {
            console: Console,
            progress: ProgressHandle,
            entries: Rc<Cell<usize>>,
            max_depth: Rc<Cell<usize>>,
        }
        impl Debugger for Recursing {
            fn enter_break(&self) {}
            fn command_loop(&self) {
                let entries = self.entries.get() + 1;
                self.entries.set(entries);
                self.max_depth
                    .set(self.max_depth.get().max(self.progress.suspend_depth()));
                if entries == 1 {
                    self.console.enter_command_loop();
                }
            }
        }

        let terminal = Buffer::default();
        let console = Console::new(Buffer::default(), terminal.clone());
        let progress = bar_progress(&terminal);
        let entries = Rc::new(Cell::new(0));
        let max_depth = Rc::new(Cell::new(0));

        let debugger = Recursing {
            console: console.clone(),
            progress: progress.clone(),
            entries: Rc::clone(&entries),
            max_depth: Rc::clone(&max_depth),
        };
        let console = console.with_debugger(debugger);
        progress.start(1);

        let guard = OutputGuard::activate(&console, &progress);
        console.enter_command_loop();

        assert_eq!(entries.get(), 2);
        assert_eq!(max_depth.get(), 2);
        assert_eq!(progress.suspend_depth(), 0);
        assert!(guard.deactivate().is_empty());
    }

    #[test]
    fn panicking_debugger_still_resumes_the_bar() {
        struct Exploding;
        impl Debugger for Exploding {
            fn enter_break(&self) {
                panic!("debugger blew up");
            }
            fn command_loop(&self) {}
        }

        let terminal = Buffer::default();
        let console =
            Console::new(Buffer::default(), terminal.clone()).with_debugger(Exploding);
        let progress = bar_progress(&terminal);
        progress.start(1);

        let guard = OutputGuard::activate(&console, &progress);
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            console.enter_break();
        }));
        assert!(caught.is_err());
        assert_eq!(progress.suspend_depth(), 0);
        drop(guard);
    }
}
