use crate::suite::Suite;

/// Walk `suite` and hand each node at the fixture-owning level to `visit`,
/// exactly once per node.
///
/// A node is handed over when it is a test unit, a container whose scope
/// still has setup or teardown work, or a container with nothing below it.
/// Any other container is descended into in original child order.
///
/// Traversal stops at the first fixture-bearing level on purpose. Containers
/// call up to their ancestors for nested setup and teardown, and it is not
/// this crate's place to assume a module-level setup is cheaper to repeat
/// than the fixtures below it. Reordering underneath that level would also
/// detach units from the scopes that own their setup.
pub fn visit_fixture_level<Extra, V>(suite: Suite<Extra>, visit: &mut V)
where
    V: FnMut(Suite<Extra>),
{
    match suite {
        Suite::Test(_) => visit(suite),
        Suite::Group { scope, children } => {
            let owns_fixtures = scope
                .as_ref()
                .is_some_and(crate::suite::FixtureScope::has_fixture_work);
            if owns_fixtures || children.is_empty() {
                visit(Suite::Group { scope, children });
            } else {
                for child in children {
                    visit_fixture_level(child, visit);
                }
            }
        }
    }
}
