use std::io::{self, Cursor, Read};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::config::Compression;
use crate::constants::container::{
    GZIP_HEADER_BYTES, GZIP_MAGIC, GZIP_METHOD_DEFLATE, GZIP_RESERVED_FLAGS,
};
use crate::errors::PipelineError;
use crate::source::{ArchiveEntry, EntryStream};
use crate::utils::is_hidden_entry;

/// Reader that replays already-inspected header bytes before the rest of the input.
pub type Replayed<R> = io::Chain<Cursor<Vec<u8>>, R>;
/// Decompressing reader produced by [`gzip_reader`].
pub type GzipReader<R> = GzDecoder<Replayed<R>>;
/// Type-erased archive byte stream produced by [`open_archive`].
pub type ArchiveReader<'r> = Box<dyn Read + 'r>;

/// Wrap a plain tar byte stream.
pub fn open_tar<R: Read>(reader: R) -> Archive<R> {
    Archive::new(reader)
}

/// Wrap a gzip-compressed tar byte stream, validating the gzip magic up front.
pub fn open_tar_gz<R: Read>(reader: R) -> Result<Archive<GzipReader<R>>, PipelineError> {
    Ok(Archive::new(gzip_reader(reader)?))
}

/// Open a tar stream using the requested compression policy.
pub fn open_archive<'r, R: Read + 'r>(
    reader: R,
    compression: Compression,
) -> Result<Archive<ArchiveReader<'r>>, PipelineError> {
    let inner: ArchiveReader<'r> = match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(gzip_reader(reader)?),
        Compression::Auto => {
            let (head, rest) = peek_header(reader, GZIP_HEADER_BYTES)?;
            if head.starts_with(&GZIP_MAGIC) {
                debug!("detected gzip container");
                check_gzip_header(&head)?;
                Box::new(GzDecoder::new(Cursor::new(head).chain(rest)))
            } else {
                Box::new(Cursor::new(head).chain(rest))
            }
        }
    };
    Ok(Archive::new(inner))
}

/// Validate the fixed gzip header and return a decompressing reader.
///
/// Fails with [`PipelineError::Format`] before any payload is inflated when
/// the magic, compression method, or flag byte is wrong, or when the input
/// ends inside the header.
pub fn gzip_reader<R: Read>(reader: R) -> Result<GzipReader<R>, PipelineError> {
    let (head, rest) = peek_header(reader, GZIP_HEADER_BYTES)?;
    check_gzip_header(&head)?;
    Ok(GzDecoder::new(Cursor::new(head).chain(rest)))
}

fn check_gzip_header(head: &[u8]) -> Result<(), PipelineError> {
    let magic = &head[..head.len().min(GZIP_MAGIC.len())];
    if magic != GZIP_MAGIC.as_slice() {
        if magic.len() < GZIP_MAGIC.len() {
            return Err(PipelineError::Format("truncated gzip header".into()));
        }
        return Err(PipelineError::Format(format!(
            "invalid gzip magic {:02x?}",
            magic
        )));
    }
    if head.len() < GZIP_HEADER_BYTES {
        return Err(PipelineError::Format("truncated gzip header".into()));
    }
    let method = head[2];
    if method != GZIP_METHOD_DEFLATE {
        return Err(PipelineError::Format(format!(
            "unsupported gzip compression method {method}"
        )));
    }
    let flags = head[3];
    if flags & GZIP_RESERVED_FLAGS != 0 {
        return Err(PipelineError::Format(format!(
            "reserved gzip flags set: {flags:#04x}"
        )));
    }
    Ok(())
}

fn peek_header<R: Read>(mut reader: R, len: usize) -> Result<(Vec<u8>, R), PipelineError> {
    let mut head = Vec::with_capacity(len);
    reader.by_ref().take(len as u64).read_to_end(&mut head)?;
    Ok((head, reader))
}

/// [`EntryStream`] over the regular-file entries of a tar archive.
///
/// Directory, link, and metadata headers are skipped.
pub struct TarEntries<'a, R: 'a + Read> {
    entries: tar::Entries<'a, R>,
    skip_hidden: bool,
}

impl<'a, R: 'a + Read> TarEntries<'a, R> {
    /// Start iterating `archive`, which must not have been read yet.
    pub fn new(archive: &'a mut Archive<R>) -> Result<Self, PipelineError> {
        Ok(Self {
            entries: archive.entries()?,
            skip_hidden: false,
        })
    }

    /// Skip entries whose basename starts with a dot.
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }
}

impl<'a, R: 'a + Read> EntryStream for TarEntries<'a, R> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, PipelineError> {
        for entry in self.entries.by_ref() {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            if !entry.header().entry_type().is_file() {
                debug!(entry = %name, "skipping non-file tar entry");
                continue;
            }
            if self.skip_hidden && is_hidden_entry(&name) {
                debug!(entry = %name, "skipping hidden tar entry");
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut data)?;
            return Ok(Some(ArchiveEntry { name, data }));
        }
        Ok(None)
    }
}
