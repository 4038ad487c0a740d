use image::DynamicImage;
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::constants::sample::KEY_FIELD;
use crate::types::{FieldName, GroupKey};

/// Scalar values a sample field may hold after decoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Signed integer (e.g. a parsed class label).
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

/// Value stored under one sample field.
///
/// Closed on purpose: consumers match exhaustively instead of downcasting.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleValue {
    /// Raw archive entry payload.
    Bytes(Vec<u8>),
    /// Decoded image payload.
    Image(DynamicImage),
    /// Decoded scalar payload.
    Scalar(Scalar),
}

impl SampleValue {
    /// Raw bytes, if this value has not been decoded.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SampleValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text scalar, if this value holds one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SampleValue::Scalar(Scalar::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Decoded image, if this value holds one.
    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            SampleValue::Image(img) => Some(img),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for SampleValue {
    fn from(value: Vec<u8>) -> Self {
        SampleValue::Bytes(value)
    }
}

impl From<&[u8]> for SampleValue {
    fn from(value: &[u8]) -> Self {
        SampleValue::Bytes(value.to_vec())
    }
}

impl From<Scalar> for SampleValue {
    fn from(value: Scalar) -> Self {
        SampleValue::Scalar(value)
    }
}

impl From<DynamicImage> for SampleValue {
    fn from(value: DynamicImage) -> Self {
        SampleValue::Image(value)
    }
}

/// One grouped training sample: field name to value.
///
/// Fields iterate in insertion (archive) order; equality ignores order.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    fields: IndexMap<FieldName, SampleValue>,
}

impl Sample {
    /// Create an empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `name`, replacing (and returning) any previous value.
    pub fn insert(
        &mut self,
        name: impl Into<FieldName>,
        value: impl Into<SampleValue>,
    ) -> Option<SampleValue> {
        match self.fields.entry(name.into()) {
            Entry::Occupied(mut slot) => Some(slot.insert(value.into())),
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                None
            }
        }
    }

    /// Value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&SampleValue> {
        self.fields.get(name)
    }

    /// Mutable value stored under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SampleValue> {
        self.fields.get_mut(name)
    }

    /// Raw bytes stored under `name`, if present and undecoded.
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(SampleValue::as_bytes)
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove `name`, keeping the order of the remaining fields.
    pub fn remove(&mut self, name: &str) -> Option<SampleValue> {
        self.fields.shift_remove(name)
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|name, _| keep(name));
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields, the key field included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the sample has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Group key carried in the reserved key field, if set.
    pub fn key(&self) -> Option<&str> {
        self.get(KEY_FIELD).and_then(SampleValue::as_text)
    }

    /// Store the group key in the reserved key field.
    pub fn set_key(&mut self, key: impl Into<GroupKey>) {
        self.insert(KEY_FIELD, Scalar::Text(key.into()));
    }

    pub(crate) fn set_key_field(&mut self, field: &str, key: impl Into<GroupKey>) {
        self.insert(field, Scalar::Text(key.into()));
    }
}

impl PartialEq for Sample {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.fields.get(name) == Some(value))
    }
}

impl IntoIterator for Sample {
    type Item = (FieldName, SampleValue);
    type IntoIter = indexmap::map::IntoIter<FieldName, SampleValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Sample
where
    K: Into<FieldName>,
    V: Into<SampleValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sample = Sample::new();
        for (name, value) in iter {
            sample.insert(name, value);
        }
        sample
    }
}
