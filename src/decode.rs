//! Fallible transformations that decode raw entry payloads in place.
//!
//! Only fields still holding raw bytes are decoded; absent fields and fields
//! that were already decoded are left untouched.

use crate::data::{Sample, SampleValue, Scalar};
use crate::errors::PipelineError;
use crate::transform::TrySampleTransformation;
use crate::types::FieldName;

fn decode_fields(
    mut sample: Sample,
    fields: &[FieldName],
    decode: impl Fn(&str, &[u8]) -> Result<SampleValue, PipelineError>,
) -> Result<Sample, PipelineError> {
    for field in fields {
        let decoded = match sample.get(field) {
            Some(SampleValue::Bytes(bytes)) => decode(field, bytes)?,
            _ => continue,
        };
        sample.insert(field.as_str(), decoded);
    }
    Ok(sample)
}

fn utf8<'a>(field: &str, bytes: &'a [u8]) -> Result<&'a str, PipelineError> {
    std::str::from_utf8(bytes).map_err(|err| PipelineError::conversion(field, err.to_string()))
}

/// Decode JPEG, PNG, or GIF payloads into images.
#[derive(Clone, Debug)]
pub struct DecodeImages {
    fields: Vec<FieldName>,
}

impl DecodeImages {
    /// Decode the listed fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl TrySampleTransformation for DecodeImages {
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError> {
        decode_fields(sample, &self.fields, |field, bytes| {
            image::load_from_memory(bytes)
                .map(SampleValue::Image)
                .map_err(|err| PipelineError::conversion(field, err.to_string()))
        })
    }
}

/// Decode UTF-8 payloads into text scalars.
#[derive(Clone, Debug)]
pub struct DecodeText {
    fields: Vec<FieldName>,
}

impl DecodeText {
    /// Decode the listed fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl TrySampleTransformation for DecodeText {
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError> {
        decode_fields(sample, &self.fields, |field, bytes| {
            Ok(SampleValue::Scalar(Scalar::Text(utf8(field, bytes)?.to_owned())))
        })
    }
}

/// Decode textual integers (e.g. a `cls` entry holding `"7\n"`).
#[derive(Clone, Debug)]
pub struct DecodeInt {
    fields: Vec<FieldName>,
}

impl DecodeInt {
    /// Decode the listed fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl TrySampleTransformation for DecodeInt {
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError> {
        decode_fields(sample, &self.fields, |field, bytes| {
            let text = utf8(field, bytes)?.trim();
            text.parse::<i64>()
                .map(|value| SampleValue::Scalar(Scalar::Int(value)))
                .map_err(|err| PipelineError::conversion(field, format!("'{text}': {err}")))
        })
    }
}
