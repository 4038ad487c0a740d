//! Archive entry sources.
//!
//! Ownership model:
//! - `EntryStream` is the demuxer-facing interface yielding raw entries in
//!   archive order.
//! - Container decoding (tar framing, decompression) lives behind it in
//!   `crate::transport`; the demuxer never sees container details.

use std::collections::VecDeque;

use crate::errors::PipelineError;
use crate::types::{EntryName, Payload};

/// One raw archive entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path as stored in the container.
    pub name: EntryName,
    /// Entry payload.
    pub data: Payload,
}

impl ArchiveEntry {
    /// Entry named `name` holding `data`.
    pub fn new(name: impl Into<EntryName>, data: impl Into<Payload>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Sequential, single-pass source of archive entries.
///
/// `Ok(None)` marks the end of the stream and is distinct from every error.
/// After an error the stream is not expected to recover.
pub trait EntryStream {
    /// Return the next entry in archive order.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, PipelineError>;
}

impl<S: EntryStream + ?Sized> EntryStream for Box<S> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, PipelineError> {
        (**self).next_entry()
    }
}

impl<S: EntryStream + ?Sized> EntryStream for &mut S {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, PipelineError> {
        (**self).next_entry()
    }
}

/// Entry stream backed by prebuilt entries; useful for tests and adapters.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEntries {
    entries: VecDeque<ArchiveEntry>,
}

impl InMemoryEntries {
    /// Create a stream that yields `entries` in order.
    pub fn new(entries: impl IntoIterator<Item = ArchiveEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl EntryStream for InMemoryEntries {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, PipelineError> {
        Ok(self.entries.pop_front())
    }
}

impl<N, D> FromIterator<(N, D)> for InMemoryEntries
where
    N: Into<EntryName>,
    D: Into<Payload>,
{
    fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, data)| ArchiveEntry::new(name, data)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_entries_drain_in_order() {
        let mut stream: InMemoryEntries = [("a.cls", b"1".to_vec()), ("a.jpg", b"2".to_vec())]
            .into_iter()
            .collect();
        assert_eq!(stream.remaining(), 2);
        assert_eq!(stream.next_entry().unwrap().unwrap().name, "a.cls");
        assert_eq!(stream.next_entry().unwrap().unwrap().name, "a.jpg");
        assert!(stream.next_entry().unwrap().is_none());
        assert!(stream.next_entry().unwrap().is_none());
    }
}
