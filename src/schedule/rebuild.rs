use crate::suite::{FixtureKey, Suite};

use super::{Bucket, Bucketer, visit_fixture_level};

/// Advise the members of one bucket who sets up and who tears down.
///
/// For a non-empty key the first member sets up, the last member tears down
/// and everyone else does neither. A single member does both. Empty-key
/// buckets are left exactly as they arrived.
pub fn annotate<Extra>(key: &FixtureKey, bucket: &mut Bucket<Extra>) {
    if key.is_empty() || bucket.is_empty() {
        return;
    }
    let last = bucket.len() - 1;
    for (at, member) in bucket.iter_mut().enumerate() {
        member.set_setup_flag(at == 0);
        member.set_teardown_flag(at == last);
    }
}

/// Lay bucket contents end to end in bucket-creation order.
pub fn flatten<Extra>(
    buckets: impl IntoIterator<Item = (FixtureKey, Bucket<Extra>)>,
) -> Vec<Suite<Extra>> {
    let mut sequence = Vec::new();
    for (_, bucket) in buckets {
        sequence.extend(bucket);
    }
    sequence
}

/// Wrap a flattened sequence in a single scope-less container, ready for
/// sequential execution by the host framework.
pub fn build<Extra>(sequence: Vec<Suite<Extra>>) -> Suite<Extra> {
    Suite::group(None, sequence)
}

/// Reorder `suite` so nodes sharing a fixture set run contiguously.
///
/// Traverses at the fixture-owning level, buckets by fixture-set identity,
/// annotates the setup/teardown edges of every bucket and rebuilds one flat
/// container. The result is a permutation of the traversed nodes; nothing is
/// dropped, duplicated or invented.
pub fn rebuild<Extra>(suite: Suite<Extra>) -> Suite<Extra> {
    let mut bucketer = Bucketer::new();
    visit_fixture_level(suite, &mut |node| bucketer.add(node));

    let mut buckets: Vec<_> = bucketer.into_buckets().collect();
    for (key, bucket) in &mut buckets {
        annotate(key, bucket);
    }
    build(flatten(buckets))
}
