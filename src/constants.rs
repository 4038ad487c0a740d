/// Constants describing how archive entries map onto samples.
pub mod sample {
    /// Reserved field carrying the group key of every demultiplexed sample.
    pub const KEY_FIELD: &str = "__key__";
    /// Separator between group key and field name in an entry name.
    pub const EXTENSION_SEPARATOR: char = '.';
    /// Separator between path components in an entry name.
    pub const PATH_SEPARATOR: char = '/';
}

/// Constants used when validating container headers.
pub mod container {
    /// Leading bytes of every gzip member.
    pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
    /// Size of the fixed gzip member header (magic, method, flags, mtime, xfl, os).
    pub const GZIP_HEADER_BYTES: usize = 10;
    /// The only compression method gzip defines (deflate).
    pub const GZIP_METHOD_DEFLATE: u8 = 8;
    /// Flag bits that must be zero in a valid gzip header.
    pub const GZIP_RESERVED_FLAGS: u8 = 0xe0;
}

/// Constants used by the record framing layer.
pub mod framing {
    /// Bytes used by the little-endian length prefix.
    pub const LENGTH_BYTES: usize = 8;
    /// Bytes used by each masked checksum.
    pub const CRC_BYTES: usize = 4;
    /// Rotation mask delta applied to raw CRC32C values.
    pub const CRC_MASK_DELTA: u32 = 0xa282_ead8;
}

/// Constants used by the image convenience helpers.
pub mod imaging {
    /// Initial buffer capacity multiplier (bytes per pixel) for PNG encoding.
    pub const ENCODE_BYTES_PER_PIXEL: usize = 8;
}
