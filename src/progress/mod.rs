//! Live progress reporting for caravan.
//!
//! One line of terminal real estate tracks the whole run. [`ProgressBar`]
//! renders that line from the current [`RunTally`](crate::outcome::RunTally),
//! and [`ProgressCoordinator`] owns the tally, the phase machine and the
//! suspend/resume protocol that keeps the line intact while tests print or a
//! debugger takes over the terminal.

mod bar;
pub use bar::*;

mod coordinator;
pub use coordinator::*;
