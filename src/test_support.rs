use std::{borrow::Cow, cell::RefCell, io, rc::Rc};

use crate::suite::{FixtureScope, Suite, TestUnit};

pub fn unit(name: impl Into<Cow<'static, str>>) -> Suite {
    Suite::Test(TestUnit::new(name, ()))
}

pub fn group(children: Vec<Suite>) -> Suite {
    Suite::group(None, children)
}

pub fn fixture_group(fixtures: &[&'static str], children: Vec<Suite>) -> Suite {
    Suite::group(Some(FixtureScope::new(fixtures.iter().copied())), children)
}

/// Stable identity of a node for assertions: the leaf name, or all leaf
/// names of a container joined with `+`.
pub fn node_name(node: &Suite) -> String {
    match node {
        Suite::Test(unit) => unit.name.to_string(),
        Suite::Group { children, .. } => children
            .iter()
            .map(node_name)
            .collect::<Vec<_>>()
            .join("+"),
    }
}

/// Shared in-memory write target standing in for a terminal.
#[derive(Debug, Default, Clone)]
pub struct Buffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("buffer holds valid utf-8")
    }

    /// Successive states of the repainted line, erase sequences removed.
    pub fn visible_lines(&self) -> Vec<String> {
        self.contents()
            .split("\r\x1b[2K")
            .filter(|part| !part.is_empty())
            .map(|part| part.trim_end_matches('\n').to_string())
            .collect()
    }
}
