use std::{borrow::Cow, collections::BTreeSet};

/// Identifier of a shared fixture, compared by value.
pub type FixtureId = Cow<'static, str>;

/// One runnable test, opaque to the scheduler.
///
/// A unit carries only its identity and an optional host payload. Fixture
/// information lives on the surrounding [`FixtureScope`], never on the unit.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct TestUnit<Extra = ()> {
    pub name: Cow<'static, str>,
    pub extra: Extra,
}

impl<Extra> TestUnit<Extra> {
    pub fn new(name: impl Into<Cow<'static, str>>, extra: Extra) -> Self {
        Self {
            name: name.into(),
            extra,
        }
    }
}

/// The shared setup scope attached to a container node.
///
/// Holds the set of fixtures the contained tests depend on and the two
/// advisory flags the scheduler rewrites. Both flags default to `true`, so an
/// untouched scope always sets up and tears down its own fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureScope {
    fixtures: BTreeSet<FixtureId>,
    pub should_setup_fixtures: bool,
    pub should_teardown_fixtures: bool,
}

impl Default for FixtureScope {
    fn default() -> Self {
        Self {
            fixtures: BTreeSet::new(),
            should_setup_fixtures: true,
            should_teardown_fixtures: true,
        }
    }
}

impl FixtureScope {
    pub fn new<I, F>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FixtureId>,
    {
        Self {
            fixtures: fixtures.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn fixtures(&self) -> &BTreeSet<FixtureId> {
        &self.fixtures
    }

    /// Whether this scope still has setup or teardown work of its own.
    pub fn has_fixture_work(&self) -> bool {
        self.should_setup_fixtures || self.should_teardown_fixtures
    }
}

/// The unordered fixture-set identity of a scope.
///
/// Two scopes bucket together exactly when their fixture sets are equal as
/// sets. The empty key is valid and means "no shared fixtures".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FixtureKey(BTreeSet<FixtureId>);

impl FixtureKey {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&FixtureScope> for FixtureKey {
    fn from(scope: &FixtureScope) -> Self {
        Self(scope.fixtures.clone())
    }
}

impl<F: Into<FixtureId>> FromIterator<F> for FixtureKey {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A node of the suite tree handed over by the host framework.
///
/// Either a single [`TestUnit`] or a container with ordered children and an
/// optional [`FixtureScope`]. The scheduler consumes the tree by value and
/// re-links the same nodes into a new root. Only the two scope flags are ever
/// mutated.
#[derive(Debug, Clone)]
pub enum Suite<Extra = ()> {
    Test(TestUnit<Extra>),
    Group {
        scope: Option<FixtureScope>,
        children: Vec<Suite<Extra>>,
    },
}

impl<Extra> From<TestUnit<Extra>> for Suite<Extra> {
    fn from(unit: TestUnit<Extra>) -> Self {
        Self::Test(unit)
    }
}

impl<Extra> Suite<Extra> {
    pub fn group(scope: Option<FixtureScope>, children: Vec<Suite<Extra>>) -> Self {
        Self::Group { scope, children }
    }

    pub fn scope(&self) -> Option<&FixtureScope> {
        match self {
            Self::Test(_) => None,
            Self::Group { scope, .. } => scope.as_ref(),
        }
    }

    /// Whether this node carries fixture responsibility of its own.
    pub fn has_fixture_scope(&self) -> bool {
        self.scope().is_some_and(FixtureScope::has_fixture_work)
    }

    /// The fixture-set identity of this node, empty for leaves and
    /// scope-less containers.
    pub fn fixture_key(&self) -> FixtureKey {
        match self.scope() {
            Some(scope) => FixtureKey::from(scope),
            None => FixtureKey::empty(),
        }
    }

    /// Advise this node whether to set up its fixtures. No-op on nodes
    /// without a scope.
    pub fn set_setup_flag(&mut self, setup: bool) {
        if let Self::Group {
            scope: Some(scope), ..
        } = self
        {
            scope.should_setup_fixtures = setup;
        }
    }

    /// Advise this node whether to tear down its fixtures. No-op on nodes
    /// without a scope.
    pub fn set_teardown_flag(&mut self, teardown: bool) {
        if let Self::Group {
            scope: Some(scope), ..
        } = self
        {
            scope.should_teardown_fixtures = teardown;
        }
    }

    /// Number of terminal units in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Test(_) => 1,
            Self::Group { children, .. } => children.iter().map(Suite::leaf_count).sum(),
        }
    }
}
