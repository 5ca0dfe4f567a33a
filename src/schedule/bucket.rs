use std::collections::HashMap;

use crate::suite::{FixtureKey, Suite};

/// Nodes sharing one fixture-set identity, in first-encounter order.
pub type Bucket<Extra> = Vec<Suite<Extra>>;

/// Groups traversed nodes by their fixture-set identity.
///
/// Buckets are created at the position their key is first seen and keep their
/// members in insertion order, so repeated runs over the same tree always
/// produce the same sequence. One pass, linear in the number of nodes added,
/// with extra space per distinct key.
#[derive(Debug)]
pub struct Bucketer<Extra> {
    buckets: Vec<(FixtureKey, Bucket<Extra>)>,
    index: HashMap<FixtureKey, usize>,
}

impl<Extra> Default for Bucketer<Extra> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<Extra> Bucketer<Extra> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node` to the bucket for its fixture key, creating the bucket
    /// on first use. Nodes without a scope land in the empty-key bucket.
    pub fn add(&mut self, node: Suite<Extra>) {
        let key = node.fixture_key();
        match self.index.get(&key) {
            Some(&at) => self.buckets[at].1.push(node),
            None => {
                self.index.insert(key.clone(), self.buckets.len());
                self.buckets.push((key, vec![node]));
            }
        }
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The buckets, in key first-encounter order.
    pub fn into_buckets(self) -> impl ExactSizeIterator<Item = (FixtureKey, Bucket<Extra>)> {
        self.buckets.into_iter()
    }
}
