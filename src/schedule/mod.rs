//! Fixture-locality scheduling for caravan.
//!
//! This module turns the host framework's nested suite tree into one flat
//! sequence in which nodes sharing an identical fixture set sit next to each
//! other, so expensive shared setup and teardown happen once per stretch
//! instead of once per node.
//!
//! Scheduling is split into four small pieces:
//! - [`visit_fixture_level`] walks the tree at the coarsest granularity that
//!   owns fixture responsibility
//! - [`Bucketer`] groups the visited nodes by fixture-set identity
//! - [`annotate`], [`flatten`] and [`build`] mark the setup/teardown edges of
//!   each bucket and lay the buckets end to end
//! - [`load_counted`] obtains a unit total alongside the executable suite
//!
//! [`rebuild`] composes the first three into the host-facing operation.

mod traverse;
pub use traverse::*;

mod bucket;
pub use bucket::*;

mod rebuild;
pub use rebuild::*;

mod count;
pub use count::*;
