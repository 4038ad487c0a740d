use std::borrow::Cow;

use crate::constants::sample::KEY_FIELD;

/// Container compression applied around the tar stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Plain, uncompressed tar.
    #[default]
    None,
    /// Gzip-wrapped tar; the gzip header is validated at open time.
    Gzip,
    /// Detect gzip by its magic bytes, otherwise read plain tar.
    Auto,
}

/// Controls how archives are opened and demultiplexed.
#[derive(Clone, Debug)]
pub struct DemuxConfig {
    /// Reserved field that receives each sample's group key.
    pub key_field: Cow<'static, str>,
    /// Compression layer expected around the archive.
    pub compression: Compression,
    /// Skip entries whose basename starts with `.` (editor/OS droppings).
    pub skip_hidden: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            key_field: Cow::Borrowed(KEY_FIELD),
            compression: Compression::None,
            skip_hidden: false,
        }
    }
}

impl DemuxConfig {
    /// Override the reserved key field name.
    pub fn with_key_field(mut self, key_field: impl Into<Cow<'static, str>>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Set the expected compression layer.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable or disable skipping of hidden entries.
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }
}
