use tracing::debug;

use crate::suite::Suite;

/// A suite together with the unit total reported for it.
#[derive(Debug)]
#[non_exhaustive]
pub struct CountedSuite<Extra = ()> {
    pub total: usize,
    pub suite: Suite<Extra>,
}

impl<Extra> CountedSuite<Extra> {
    /// Count an already materialized tree in place.
    ///
    /// Prefer this when the host can hand over the suite it will actually
    /// execute; the total is then exact by construction.
    pub fn from_materialized(suite: Suite<Extra>) -> Self {
        Self {
            total: suite.leaf_count(),
            suite,
        }
    }
}

/// Obtain a unit total alongside the executable suite by invoking `produce`
/// twice: once purely for counting, once for the suite handed on.
///
/// The host's suite producer may yield a lazily built structure that counting
/// would consume, so the count is taken from a throwaway invocation. This is
/// a documented limitation, not a guarantee: a producer with side effects may
/// disagree between the two invocations, and downstream consumers treat the
/// total as approximate rather than as ground truth.
pub fn load_counted<Extra, P>(mut produce: P) -> CountedSuite<Extra>
where
    P: FnMut() -> Suite<Extra>,
{
    let total = produce().leaf_count();
    let suite = produce();
    let recount = suite.leaf_count();
    if recount != total {
        debug!(
            total,
            recount, "suite producer changed its unit count between invocations"
        );
    }
    CountedSuite { total, suite }
}
