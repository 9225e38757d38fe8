//! Resolution path tracking for dependency traversals.

use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use crate::identity::ServiceIdentity;

pub(crate) const MAX_DEPTH: usize = 1024;

/// Stack of services currently being expanded, root first.
///
/// Each entry also records the graph node the service was expanded from, so
/// repeated instantiations of one open-generic node can be found.
#[derive(Debug)]
pub(crate) struct ResolutionPath {
    stack: SmallVec<[(ServiceIdentity, usize); 16]>,
    limit: usize,
}

/// The path limit was reached; the caller stops expanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DepthExceeded(pub(crate) usize);

impl ResolutionPath {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            stack: SmallVec::new(),
            limit: limit.clamp(1, MAX_DEPTH),
        }
    }

    /// Depth at which `identity` is on the path, if it is.
    pub(crate) fn position(&self, identity: &ServiceIdentity) -> Option<usize> {
        self.stack.iter().position(|(entry, _)| entry == identity)
    }

    /// Entries expanded from `node`, outermost first, with their depth.
    pub(crate) fn entries_of(
        &self,
        node: usize,
    ) -> impl Iterator<Item = (usize, &ServiceIdentity)> + '_ {
        self.stack
            .iter()
            .enumerate()
            .filter(move |(_, (_, n))| *n == node)
            .map(|(depth, (identity, _))| (depth, identity))
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes `identity`, expanded from `node`; the returned guard pops it when dropped.
    pub(crate) fn enter(
        &mut self,
        identity: ServiceIdentity,
        node: usize,
    ) -> Result<PathGuard<'_>, DepthExceeded> {
        if self.stack.len() >= self.limit {
            return Err(DepthExceeded(self.stack.len()));
        }
        self.stack.push((identity, node));
        Ok(PathGuard { path: self })
    }
}

/// Keeps one entry on the path for the guard's lifetime.
pub(crate) struct PathGuard<'a> {
    path: &'a mut ResolutionPath,
}

impl Deref for PathGuard<'_> {
    type Target = ResolutionPath;

    fn deref(&self) -> &ResolutionPath {
        self.path
    }
}

impl DerefMut for PathGuard<'_> {
    fn deref_mut(&mut self) -> &mut ResolutionPath {
        self.path
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.path.stack.pop();
    }
}
