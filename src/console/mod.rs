//! Console target registry for caravan.
//!
//! A [`Console`] holds the run's replaceable output targets: the two text
//! channels everything prints through, and the debugger's break-entry and
//! command-loop hooks. Hosts route writes and debugger entries through the
//! console instead of ambient globals, which is what lets [`OutputGuard`]
//! displace the targets for a run and put them back exactly on the way out.

use std::{cell::RefCell, io, rc::Rc};

mod debugger;
pub use debugger::*;

mod guard;
pub use guard::*;

pub use crate::progress::SharedWrite;

/// A debugger entry point slot. Hooks take `&self` so a debugger re-entered
/// from within its own command loop keeps working.
pub type ConsoleHook = Rc<dyn Fn()>;

struct Slots {
    out: SharedWrite,
    err: SharedWrite,
    on_break: ConsoleHook,
    command_loop: ConsoleHook,
}

/// Cloneable handle to the run's output targets.
///
/// All clones observe the same slots. The run is single-threaded, so slot
/// access is plain reference counting; every operation clones the slot out of
/// the registry before using it, keeping re-entrant calls safe.
#[derive(Clone)]
pub struct Console {
    slots: Rc<RefCell<Slots>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl Console {
    pub fn new(out: impl io::Write + 'static, err: impl io::Write + 'static) -> Self {
        let debugger = Rc::new(NoDebugger);
        let on_break = {
            let debugger = Rc::clone(&debugger);
            Rc::new(move || debugger.enter_break()) as ConsoleHook
        };
        let command_loop = Rc::new(move || debugger.command_loop()) as ConsoleHook;
        Self {
            slots: Rc::new(RefCell::new(Slots {
                out: Rc::new(RefCell::new(out)),
                err: Rc::new(RefCell::new(err)),
                on_break,
                command_loop,
            })),
        }
    }

    /// A console over the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Install `debugger` behind both debugger slots.
    pub fn with_debugger(self, debugger: impl Debugger + 'static) -> Self {
        let debugger = Rc::new(debugger);
        {
            let mut slots = self.slots.borrow_mut();
            let on_break = Rc::clone(&debugger);
            slots.on_break = Rc::new(move || on_break.enter_break());
            slots.command_loop = Rc::new(move || debugger.command_loop());
        }
        self
    }

    /// Write through the currently installed out channel.
    pub fn write_out(&self, buf: &[u8]) -> io::Result<()> {
        let target = Rc::clone(&self.slots.borrow().out);
        let mut target = target.borrow_mut();
        target.write_all(buf)?;
        target.flush()
    }

    /// Write through the currently installed err channel.
    pub fn write_err(&self, buf: &[u8]) -> io::Result<()> {
        let target = Rc::clone(&self.slots.borrow().err);
        let mut target = target.borrow_mut();
        target.write_all(buf)?;
        target.flush()
    }

    /// Fire the break-entry hook, as a host does when a breakpoint hits.
    pub fn enter_break(&self) {
        let hook = Rc::clone(&self.slots.borrow().on_break);
        hook();
    }

    /// Fire the interactive command-loop hook.
    pub fn enter_command_loop(&self) {
        let hook = Rc::clone(&self.slots.borrow().command_loop);
        hook();
    }

    /// The currently installed err channel. The progress bar paints here,
    /// bypassing any interceptors installed later.
    pub(crate) fn err_target(&self) -> SharedWrite {
        Rc::clone(&self.slots.borrow().err)
    }

    pub(crate) fn out_target(&self) -> SharedWrite {
        Rc::clone(&self.slots.borrow().out)
    }

    pub(crate) fn break_hook(&self) -> ConsoleHook {
        Rc::clone(&self.slots.borrow().on_break)
    }

    pub(crate) fn command_loop_hook(&self) -> ConsoleHook {
        Rc::clone(&self.slots.borrow().command_loop)
    }

    pub(crate) fn replace_out(&self, new: SharedWrite) -> SharedWrite {
        std::mem::replace(&mut self.slots.borrow_mut().out, new)
    }

    pub(crate) fn replace_err(&self, new: SharedWrite) -> SharedWrite {
        std::mem::replace(&mut self.slots.borrow_mut().err, new)
    }

    pub(crate) fn replace_break(&self, new: ConsoleHook) -> ConsoleHook {
        std::mem::replace(&mut self.slots.borrow_mut().on_break, new)
    }

    pub(crate) fn replace_command_loop(&self, new: ConsoleHook) -> ConsoleHook {
        std::mem::replace(&mut self.slots.borrow_mut().command_loop, new)
    }
}
