use std::ops::Deref;

/// Immutable state of a container at one version.
///
/// Version `0` is the initial state; each successful update increments it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    version: u64,
    data: S,
}

impl<S> Snapshot<S> {
    pub(crate) fn new(version: u64, data: S) -> Self {
        Self { version, data }
    }

    /// Version of this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The state value.
    pub fn data(&self) -> &S {
        &self.data
    }
}

impl<S> Deref for Snapshot<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.data
    }
}
