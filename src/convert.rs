//! Sample to typed-record conversion.

use std::collections::HashMap;

use tracing::debug;

use crate::data::{Sample, SampleValue, Scalar};
use crate::errors::PipelineError;
use crate::record::{Feature, TypedRecord, encode_png};
use crate::types::FieldName;

/// Target feature kind for one sample field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-element bytes list (text is stored as UTF-8, images as PNG).
    Bytes,
    /// Single-element int64 list; textual payloads are parsed.
    Int64,
    /// Single-element float list; textual payloads are parsed.
    Float,
    /// Single-element bytes list holding a PNG; raw payloads are decoded
    /// first, so JPEG or GIF bytes are re-encoded.
    Image,
}

/// Converts samples into typed records, one feature per field.
///
/// Fields without an explicit rule follow their value: raw bytes, text, and
/// images become bytes; integers become int64; floats become float.
#[derive(Clone, Debug, Default)]
pub struct SampleToRecord {
    rules: HashMap<FieldName, FieldKind>,
}

impl SampleToRecord {
    /// Converter with no per-field rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `field` to convert to `kind`.
    pub fn with_rule(mut self, field: impl Into<FieldName>, kind: FieldKind) -> Self {
        self.rules.insert(field.into(), kind);
        self
    }

    /// Consume `sample` and build the matching record.
    pub fn convert(&self, sample: Sample) -> Result<TypedRecord, PipelineError> {
        let mut record = TypedRecord::new();
        for (name, value) in sample {
            let feature = match self.rules.get(&name) {
                Some(kind) => convert_as(&name, value, *kind)?,
                None => natural_feature(value)?,
            };
            record.set_feature(name, feature);
        }
        debug!(features = record.len(), "converted sample to record");
        Ok(record)
    }
}

fn natural_feature(value: SampleValue) -> Result<Feature, PipelineError> {
    Ok(match value {
        SampleValue::Scalar(Scalar::Int(value)) => Feature::Int64List(vec![value]),
        SampleValue::Scalar(Scalar::Float(value)) => Feature::FloatList(vec![value as f32]),
        other => Feature::BytesList(vec![into_bytes(other)?]),
    })
}

fn convert_as(field: &str, value: SampleValue, kind: FieldKind) -> Result<Feature, PipelineError> {
    match kind {
        FieldKind::Bytes => Ok(Feature::BytesList(vec![into_bytes(value)?])),
        FieldKind::Int64 => {
            let parsed = match value {
                SampleValue::Scalar(Scalar::Int(value)) => value,
                SampleValue::Scalar(Scalar::Text(text)) => parse(field, &text)?,
                SampleValue::Bytes(bytes) => parse(field, text_of(field, &bytes)?)?,
                SampleValue::Scalar(Scalar::Float(_)) | SampleValue::Image(_) => {
                    return Err(PipelineError::conversion(field, "not an integer value"));
                }
            };
            Ok(Feature::Int64List(vec![parsed]))
        }
        FieldKind::Float => {
            let parsed = match value {
                SampleValue::Scalar(Scalar::Float(value)) => value as f32,
                SampleValue::Scalar(Scalar::Int(value)) => value as f32,
                SampleValue::Scalar(Scalar::Text(text)) => parse(field, &text)?,
                SampleValue::Bytes(bytes) => parse(field, text_of(field, &bytes)?)?,
                SampleValue::Image(_) => {
                    return Err(PipelineError::conversion(field, "not a numeric value"));
                }
            };
            Ok(Feature::FloatList(vec![parsed]))
        }
        FieldKind::Image => {
            let img = match value {
                SampleValue::Image(img) => img,
                SampleValue::Bytes(bytes) => image::load_from_memory(&bytes)
                    .map_err(|err| PipelineError::conversion(field, err.to_string()))?,
                SampleValue::Scalar(_) => {
                    return Err(PipelineError::conversion(field, "not an image value"));
                }
            };
            Ok(Feature::BytesList(vec![encode_png(&img)?]))
        }
    }
}

fn into_bytes(value: SampleValue) -> Result<Vec<u8>, PipelineError> {
    Ok(match value {
        SampleValue::Bytes(bytes) => bytes,
        SampleValue::Image(img) => encode_png(&img)?,
        SampleValue::Scalar(Scalar::Text(text)) => text.into_bytes(),
        SampleValue::Scalar(Scalar::Int(value)) => value.to_string().into_bytes(),
        SampleValue::Scalar(Scalar::Float(value)) => value.to_string().into_bytes(),
    })
}

fn text_of<'a>(field: &str, bytes: &'a [u8]) -> Result<&'a str, PipelineError> {
    std::str::from_utf8(bytes).map_err(|err| PipelineError::conversion(field, err.to_string()))
}

fn parse<T>(field: &str, text: &str) -> Result<T, PipelineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = text.trim();
    text.parse()
        .map_err(|err| PipelineError::conversion(field, format!("'{text}': {err}")))
}
