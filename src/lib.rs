#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Archive and conversion configuration types.
pub mod config;
/// Centralized constants used across demuxing, framing, and imaging.
pub mod constants;
/// Sample conversion into typed records.
pub mod convert;
/// Sample and sample value types.
pub mod data;
/// Fallible payload decoding stages.
pub mod decode;
/// Archive-to-sample demultiplexer.
pub mod demux;
/// Reusable example runners shared by demos.
pub mod example_apps;
/// Checksummed record framing.
pub mod framing;
/// Typed feature records.
pub mod record;
/// Keep-set selections for samples and records.
pub mod selection;
/// Archive entry stream interfaces.
pub mod source;
/// Sample and record transformations.
pub mod transform;
/// Container transports (tar, gzip).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Entry-name helpers.
pub mod utils;

mod errors;

pub use config::{Compression, DemuxConfig};
pub use convert::{FieldKind, SampleToRecord};
pub use data::{Sample, SampleValue, Scalar};
pub use decode::{DecodeImages, DecodeInt, DecodeText};
pub use demux::ArchiveDemuxer;
pub use errors::PipelineError;
pub use framing::{RecordReader, RecordWriter};
pub use record::{Feature, TypedRecord};
pub use selection::{KeepKeys, KeepPattern, KeepPrefix, RecordSelection, SampleSelection};
pub use source::{ArchiveEntry, EntryStream, InMemoryEntries};
pub use transform::{
    Identity, RecordChain, RecordSelections, RecordTransformation, Rename, SampleChain,
    SampleSelections, SampleTransformation, TrySampleTransformation,
};
pub use transport::tarball::{TarEntries, open_archive, open_tar, open_tar_gz};
pub use types::{EntryName, FeatureName, FieldName, GroupKey, Payload};
