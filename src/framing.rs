//! Length-prefixed, checksummed framing for typed records.
//!
//! Layout of one frame (all integers little-endian):
//!
//! ```text
//! u64 length | u32 masked_crc32c(length bytes) | payload | u32 masked_crc32c(payload)
//! ```
//!
//! The length and the payload carry separate checksums so a corrupt length
//! is detected before the reader trusts it to size a buffer. The payload is
//! the JSON encoding of a [`TypedRecord`]. JSON has no spelling for NaN or
//! the infinities, so records holding non-finite floats are rejected before
//! anything is written.

use std::io::{self, Read, Write};

use crc32c::crc32c;
use tracing::debug;

use crate::constants::framing::{CRC_BYTES, CRC_MASK_DELTA, LENGTH_BYTES};
use crate::errors::PipelineError;
use crate::record::{Feature, TypedRecord};

/// Rotate and offset a raw CRC32C so checksums of checksummed data stay well distributed.
pub fn mask_crc(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(CRC_MASK_DELTA)
}

/// Inverse of [`mask_crc`].
pub fn unmask_crc(masked: u32) -> u32 {
    masked.wrapping_sub(CRC_MASK_DELTA).rotate_left(15)
}

/// Encode one framed payload into `buf`.
pub fn encode_frame(payload: &[u8], buf: &mut Vec<u8>) {
    let len_bytes = (payload.len() as u64).to_le_bytes();
    buf.reserve(LENGTH_BYTES + CRC_BYTES * 2 + payload.len());
    buf.extend_from_slice(&len_bytes);
    buf.extend_from_slice(&mask_crc(crc32c(&len_bytes)).to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&mask_crc(crc32c(payload)).to_le_bytes());
}

/// Writes framed records to an underlying sink.
pub struct RecordWriter<W: Write> {
    inner: W,
    written: usize,
    scratch: Vec<u8>,
}

impl<W: Write> RecordWriter<W> {
    /// Write frames to `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            scratch: Vec::new(),
        }
    }

    /// Serialize and append `record` as one frame.
    ///
    /// Fails with [`PipelineError::Conversion`] naming the feature when a
    /// float list holds NaN or an infinity; the sink is left untouched.
    pub fn write_record(&mut self, record: &TypedRecord) -> Result<(), PipelineError> {
        check_finite(record)?;
        let payload = serde_json::to_vec(record)?;
        self.write_payload(&payload)
    }

    /// Append an already-serialized payload as one frame.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<(), PipelineError> {
        self.scratch.clear();
        encode_frame(payload, &mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        self.written += 1;
        Ok(())
    }

    /// Frames written so far.
    pub fn records_written(&self) -> usize {
        self.written
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<(), PipelineError> {
        Ok(self.inner.flush()?)
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W, PipelineError> {
        self.inner.flush()?;
        debug!(records = self.written, "record writer finished");
        Ok(self.inner)
    }
}

fn check_finite(record: &TypedRecord) -> Result<(), PipelineError> {
    for (name, feature) in record.iter() {
        let Feature::FloatList(values) = feature else {
            continue;
        };
        if let Some(value) = values.iter().find(|value| !value.is_finite()) {
            return Err(PipelineError::conversion(
                name,
                format!("non-finite float {value} cannot be framed"),
            ));
        }
    }
    Ok(())
}

/// Reads framed records, verifying both checksums of every frame.
pub struct RecordReader<R: Read> {
    inner: R,
    read: usize,
}

impl<R: Read> RecordReader<R> {
    /// Read frames from `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner, read: 0 }
    }

    /// Next record, or `Ok(None)` at a clean frame boundary end of input.
    pub fn read_record(&mut self) -> Result<Option<TypedRecord>, PipelineError> {
        match self.read_payload()? {
            Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            None => Ok(None),
        }
    }

    /// Next raw payload, or `Ok(None)` at a clean frame boundary end of input.
    pub fn read_payload(&mut self) -> Result<Option<Vec<u8>>, PipelineError> {
        let mut len_bytes = [0u8; LENGTH_BYTES];
        if !self.fill_or_eof(&mut len_bytes)? {
            return Ok(None);
        }
        let len_crc = self.read_u32("length checksum")?;
        if unmask_crc(len_crc) != crc32c(&len_bytes) {
            return Err(self.corrupt("length checksum mismatch"));
        }

        let len = usize::try_from(u64::from_le_bytes(len_bytes))
            .map_err(|_| self.corrupt("frame length exceeds address space"))?;
        let mut payload = Vec::new();
        let copied = (&mut self.inner).take(len as u64).read_to_end(&mut payload)?;
        if copied != len {
            return Err(self.corrupt("payload truncated"));
        }
        let payload_crc = self.read_u32("payload checksum")?;
        if unmask_crc(payload_crc) != crc32c(&payload) {
            return Err(self.corrupt("payload checksum mismatch"));
        }

        self.read += 1;
        Ok(Some(payload))
    }

    /// Frames read so far.
    pub fn records_read(&self) -> usize {
        self.read
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, PipelineError> {
        let mut bytes = [0u8; CRC_BYTES];
        if !self.fill_or_eof(&mut bytes)? {
            return Err(self.corrupt(&format!("{what} truncated")));
        }
        Ok(u32::from_le_bytes(bytes))
    }

    /// Fill `buf` completely; `false` if the input ended before the first byte.
    fn fill_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, PipelineError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(self.corrupt("frame header truncated")),
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }

    fn corrupt(&self, reason: &str) -> PipelineError {
        PipelineError::Corrupt(format!("frame {}: {reason}", self.read))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<TypedRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: i64) -> TypedRecord {
        let mut record = TypedRecord::new();
        record.add_int64("label", &[label]);
        record.add_bytes("img", &[&b"\x89PNG"[..]]);
        record.add_float("weight", &[0.5]);
        record
    }

    fn write_all(records: &[TypedRecord]) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        for record in records {
            writer.write_record(record).unwrap();
        }
        assert_eq!(writer.records_written(), records.len());
        writer.into_inner().unwrap()
    }

    #[test]
    fn mask_is_invertible() {
        for crc in [0, 1, 0xdead_beef, u32::MAX] {
            assert_eq!(unmask_crc(mask_crc(crc)), crc);
        }
        assert_ne!(mask_crc(0), 0);
    }

    #[test]
    fn frames_are_read_back_in_order() {
        let bytes = write_all(&[record(1), record(2)]);
        let mut reader = RecordReader::new(bytes.as_slice());
        assert_eq!(reader.read_record().unwrap().unwrap().int64("label"), 1);
        assert_eq!(reader.read_record().unwrap().unwrap().int64("label"), 2);
        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn frame_layout_matches_header_sizes() {
        let mut buf = Vec::new();
        encode_frame(b"abc", &mut buf);
        assert_eq!(buf.len(), LENGTH_BYTES + CRC_BYTES + 3 + CRC_BYTES);
        assert_eq!(&buf[..LENGTH_BYTES], &3u64.to_le_bytes());
        assert_eq!(&buf[LENGTH_BYTES + CRC_BYTES..LENGTH_BYTES + CRC_BYTES + 3], b"abc");
    }

    #[test]
    fn flipped_payload_byte_is_detected() {
        let mut bytes = write_all(&[record(1)]);
        let payload_start = LENGTH_BYTES + CRC_BYTES;
        bytes[payload_start + 2] ^= 0x01;
        let err = RecordReader::new(bytes.as_slice()).read_record().unwrap_err();
        assert!(matches!(err, PipelineError::Corrupt(ref reason) if reason.contains("payload checksum")));
    }

    #[test]
    fn flipped_length_byte_is_detected() {
        let mut bytes = write_all(&[record(1)]);
        bytes[0] ^= 0x40;
        let err = RecordReader::new(bytes.as_slice()).read_record().unwrap_err();
        assert!(matches!(err, PipelineError::Corrupt(ref reason) if reason.contains("length checksum")));
    }

    #[test]
    fn truncation_inside_a_frame_is_corruption() {
        let bytes = write_all(&[record(1)]);
        for cut in [3, LENGTH_BYTES + 2, bytes.len() - 1] {
            let err = RecordReader::new(&bytes[..cut]).read_record().unwrap_err();
            assert!(matches!(err, PipelineError::Corrupt(_)), "cut at {cut}");
        }
    }

    #[test]
    fn non_finite_floats_are_rejected_before_writing() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut rec = record(1);
            rec.add_float("score", &[0.5, bad]);
            let mut writer = RecordWriter::new(Vec::new());
            let err = writer.write_record(&rec).unwrap_err();
            assert!(matches!(err, PipelineError::Conversion { ref field, .. } if field == "score"));
            assert_eq!(writer.records_written(), 0);
            assert!(writer.into_inner().unwrap().is_empty());
        }
    }

    #[test]
    fn iterator_yields_every_record() {
        let bytes = write_all(&[record(5), record(6), record(7)]);
        let labels: Vec<i64> = RecordReader::new(bytes.as_slice())
            .map(|record| record.unwrap().int64("label"))
            .collect();
        assert_eq!(labels, vec![5, 6, 7]);
    }
}
