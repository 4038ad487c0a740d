//! Archive-to-sample demultiplexing.
//!
//! Consecutive entries sharing a group key (entry name minus extension) are
//! folded into one [`Sample`]. The demuxer keeps exactly one group pending: a
//! sample is emitted when the first entry of the next group arrives, or when
//! the entry stream ends.

use std::borrow::Cow;
use std::io::Read;
use std::iter::FusedIterator;
use std::mem;

use tar::Archive;
use tracing::{debug, warn};

use crate::config::DemuxConfig;
use crate::constants::sample::KEY_FIELD;
use crate::data::Sample;
use crate::errors::PipelineError;
use crate::source::EntryStream;
use crate::transport::tarball::TarEntries;
use crate::types::GroupKey;
use crate::utils::split_entry_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DemuxState {
    Reading,
    Finished,
    Failed,
}

/// Pull-based grouping reader over an [`EntryStream`].
///
/// Not meant to be shared between threads; every call takes `&mut self`.
pub struct ArchiveDemuxer<S: EntryStream> {
    entries: S,
    key_field: Cow<'static, str>,
    current_key: Option<GroupKey>,
    pending: Sample,
    state: DemuxState,
    emitted: usize,
}

impl<S: EntryStream> ArchiveDemuxer<S> {
    /// Demultiplex `entries` using the default reserved key field.
    pub fn new(entries: S) -> Self {
        Self {
            entries,
            key_field: Cow::Borrowed(KEY_FIELD),
            current_key: None,
            pending: Sample::new(),
            state: DemuxState::Reading,
            emitted: 0,
        }
    }

    /// Demultiplex `entries` using settings from `config`.
    pub fn with_config(entries: S, config: &DemuxConfig) -> Self {
        let mut demuxer = Self::new(entries);
        demuxer.key_field = config.key_field.clone();
        demuxer
    }

    /// Produce the next completed sample.
    ///
    /// Returns `Ok(None)` once the entry stream is exhausted and no group is
    /// pending, and keeps returning it on later calls. An entry read error is
    /// returned as-is and terminates the demuxer; later calls fail with
    /// [`PipelineError::Terminated`].
    pub fn read(&mut self) -> Result<Option<Sample>, PipelineError> {
        match self.state {
            DemuxState::Reading => {}
            DemuxState::Finished => return Ok(None),
            DemuxState::Failed => return Err(PipelineError::Terminated),
        }
        loop {
            let entry = match self.entries.next_entry() {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    self.state = DemuxState::Finished;
                    return Ok(self.complete_pending());
                }
                Err(err) => {
                    self.state = DemuxState::Failed;
                    warn!(
                        emitted = self.emitted,
                        error = %err,
                        "archive entry read failed; demuxer terminated"
                    );
                    return Err(err);
                }
            };

            let (key, field) = split_entry_name(&entry.name);
            let starts_new_group = self
                .current_key
                .as_deref()
                .is_some_and(|current| current != key);
            if starts_new_group {
                let completed = self.complete_pending();
                self.pending.insert(field, entry.data);
                self.current_key = Some(key.to_owned());
                return Ok(completed);
            }
            if self.current_key.is_none() {
                self.current_key = Some(key.to_owned());
            }
            self.pending.insert(field, entry.data);
        }
    }

    /// Number of samples emitted so far.
    pub fn samples_emitted(&self) -> usize {
        self.emitted
    }

    /// Release the underlying entry stream.
    pub fn into_inner(self) -> S {
        self.entries
    }

    fn complete_pending(&mut self) -> Option<Sample> {
        let key = self.current_key.take()?;
        let mut sample = mem::take(&mut self.pending);
        debug!(key = %key, fields = sample.len(), "emitting sample");
        sample.set_key_field(&self.key_field, key);
        self.emitted += 1;
        Some(sample)
    }
}

impl<'a, R: Read + 'a> ArchiveDemuxer<TarEntries<'a, R>> {
    /// Demultiplex the regular-file entries of a tar archive.
    ///
    /// Uses the key field and hidden-entry policy of `config`. Compression is
    /// settled when the archive is opened, so `config.compression` is not
    /// consulted here; pass it to [`open_archive`](crate::transport::tarball::open_archive)
    /// first.
    pub fn from_tar(archive: &'a mut Archive<R>, config: &DemuxConfig) -> Result<Self, PipelineError> {
        let entries = TarEntries::new(archive)?.with_skip_hidden(config.skip_hidden);
        Ok(Self::with_config(entries, config))
    }
}

impl<S: EntryStream> Iterator for ArchiveDemuxer<S> {
    type Item = Result<Sample, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == DemuxState::Failed {
            return None;
        }
        self.read().transpose()
    }
}

impl<S: EntryStream> FusedIterator for ArchiveDemuxer<S> {}
