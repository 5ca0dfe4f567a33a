/// An interactive debugger's entry points, as seen by the console.
///
/// The debugger owns its own command interpreter; the console only needs the
/// two places where it takes over the terminal. Methods take `&self` because
/// a session can be entered again from inside a running command loop; use
/// interior mutability for debugger state.
pub trait Debugger {
    /// A breakpoint fired. Called before the first exchange with the user.
    fn enter_break(&self);

    /// Run the interactive command loop until the user leaves it.
    fn command_loop(&self);
}

/// A debugger that never takes the terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoDebugger;

impl Debugger for NoDebugger {
    fn enter_break(&self) {}

    fn command_loop(&self) {}
}
