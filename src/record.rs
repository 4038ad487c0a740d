//! Typed feature records.
//!
//! A [`TypedRecord`] is the flat representation used for serialization: each
//! named feature holds exactly one list kind. Adding a feature under an
//! existing name always overwrites it, including when the kind changes.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::constants::imaging::ENCODE_BYTES_PER_PIXEL;
use crate::errors::PipelineError;
use crate::types::FeatureName;

/// A typed feature list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// List of 64-bit integers.
    Int64List(Vec<i64>),
    /// List of 32-bit floats.
    FloatList(Vec<f32>),
    /// List of byte strings.
    BytesList(Vec<Vec<u8>>),
}

impl Feature {
    /// Number of elements in the list, whatever its kind.
    pub fn len(&self) -> usize {
        match self {
            Feature::Int64List(values) => values.len(),
            Feature::FloatList(values) => values.len(),
            Feature::BytesList(values) => values.len(),
        }
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Feature::Int64List(_) => "int64_list",
            Feature::FloatList(_) => "float_list",
            Feature::BytesList(_) => "bytes_list",
        }
    }
}

/// Flat record of named, typed feature lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedRecord {
    features: BTreeMap<FeatureName, Feature>,
}

impl TypedRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feature stored under `name`, of any kind.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// Store `feature` under `name`, replacing whatever was there.
    pub fn set_feature(&mut self, name: impl Into<FeatureName>, feature: Feature) {
        self.features.insert(name.into(), feature);
    }

    /// Whether a feature named `name` exists.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Remove and return the feature named `name`.
    pub fn remove_feature(&mut self, name: &str) -> Option<Feature> {
        self.features.remove(name)
    }

    /// Keep only the features for which `keep` returns true.
    pub fn retain_features(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.features.retain(|name, _| keep(name));
    }

    /// Feature names in sorted order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Features in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Feature)> {
        self.features
            .iter()
            .map(|(name, feature)| (name.as_str(), feature))
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the record has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Store `values` under `name`, replacing any existing feature.
    pub fn add_int64_list(&mut self, name: impl Into<FeatureName>, values: Vec<i64>) {
        self.set_feature(name, Feature::Int64List(values));
    }

    /// Copying variant of [`TypedRecord::add_int64_list`].
    pub fn add_int64(&mut self, name: impl Into<FeatureName>, values: &[i64]) {
        self.add_int64_list(name, values.to_vec());
    }

    /// Widen `values` and store them as an int64 list.
    pub fn add_int_list(&mut self, name: impl Into<FeatureName>, values: &[i32]) {
        self.add_int64_list(name, values.iter().map(|&v| i64::from(v)).collect());
    }

    /// Int64 list under `name`, or `None` when absent or of another kind.
    pub fn int64_list(&self, name: &str) -> Option<&[i64]> {
        match self.feature(name)? {
            Feature::Int64List(values) => Some(values),
            _ => None,
        }
    }

    /// The single int64 stored under `name`.
    ///
    /// # Panics
    /// If the feature is missing, of another kind, or does not hold exactly
    /// one element. These are producer bugs, not recoverable input.
    pub fn int64(&self, name: &str) -> i64 {
        *singleton(name, "int64", self.int64_list(name))
    }

    /// Store `values` under `name`, replacing any existing feature.
    pub fn add_float_list(&mut self, name: impl Into<FeatureName>, values: Vec<f32>) {
        self.set_feature(name, Feature::FloatList(values));
    }

    /// Copying variant of [`TypedRecord::add_float_list`].
    pub fn add_float(&mut self, name: impl Into<FeatureName>, values: &[f32]) {
        self.add_float_list(name, values.to_vec());
    }

    /// Float list under `name`, or `None` when absent or of another kind.
    pub fn float_list(&self, name: &str) -> Option<&[f32]> {
        match self.feature(name)? {
            Feature::FloatList(values) => Some(values),
            _ => None,
        }
    }

    /// The single float stored under `name`.
    ///
    /// # Panics
    /// Same contract as [`TypedRecord::int64`].
    pub fn float(&self, name: &str) -> f32 {
        *singleton(name, "float", self.float_list(name))
    }

    /// Store `values` under `name`, replacing any existing feature.
    pub fn add_bytes_list(&mut self, name: impl Into<FeatureName>, values: Vec<Vec<u8>>) {
        self.set_feature(name, Feature::BytesList(values));
    }

    /// Copying variant of [`TypedRecord::add_bytes_list`].
    pub fn add_bytes(&mut self, name: impl Into<FeatureName>, values: &[&[u8]]) {
        self.add_bytes_list(name, values.iter().map(|v| v.to_vec()).collect());
    }

    /// Bytes list under `name`, or `None` when absent or of another kind.
    pub fn bytes_list(&self, name: &str) -> Option<&[Vec<u8>]> {
        match self.feature(name)? {
            Feature::BytesList(values) => Some(values),
            _ => None,
        }
    }

    /// The single byte payload stored under `name`.
    ///
    /// # Panics
    /// Same contract as [`TypedRecord::int64`].
    pub fn bytes(&self, name: &str) -> &[u8] {
        singleton(name, "bytes", self.bytes_list(name)).as_slice()
    }

    /// Encode `img` as PNG and store it as a single-element bytes list.
    pub fn add_image(
        &mut self,
        name: impl Into<FeatureName>,
        img: &DynamicImage,
    ) -> Result<(), PipelineError> {
        let encoded = encode_png(img)?;
        self.add_bytes_list(name, vec![encoded]);
        Ok(())
    }

    /// Decode the JPEG, PNG, or GIF payload stored under `name`.
    ///
    /// # Panics
    /// Same contract as [`TypedRecord::bytes`].
    pub fn image(&self, name: &str) -> Result<DynamicImage, PipelineError> {
        Ok(image::load_from_memory(self.bytes(name))?)
    }
}

pub(crate) fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    let capacity = img.width() as usize * img.height() as usize * ENCODE_BYTES_PER_PIXEL;
    let mut buffer = Cursor::new(Vec::with_capacity(capacity));
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn singleton<'a, T>(name: &str, kind: &str, values: Option<&'a [T]>) -> &'a T {
    let Some(values) = values else {
        panic!("feature '{name}' is not a {kind} list");
    };
    assert_eq!(
        values.len(),
        1,
        "feature '{name}' must hold exactly one {kind} value"
    );
    &values[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn add_overwrites_previous_kind() {
        let mut record = TypedRecord::new();
        record.add_int64("label", &[3]);
        record.add_float("label", &[0.5]);

        assert_eq!(record.int64_list("label"), None);
        assert_eq!(record.float_list("label"), Some(&[0.5][..]));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn add_replaces_rather_than_appends() {
        let mut record = TypedRecord::new();
        record.add_int64_list("ids", vec![1, 2]);
        record.add_int64_list("ids", vec![9]);
        assert_eq!(record.int64_list("ids"), Some(&[9][..]));
        assert_eq!(record.int64("ids"), 9);
    }

    #[test]
    fn list_accessors_return_none_for_missing_features() {
        let record = TypedRecord::new();
        assert!(record.int64_list("missing").is_none());
        assert!(record.float_list("missing").is_none());
        assert!(record.bytes_list("missing").is_none());
    }

    #[test]
    fn int_list_is_widened() {
        let mut record = TypedRecord::new();
        record.add_int_list("shape", &[28, 28, -1]);
        assert_eq!(record.int64_list("shape"), Some(&[28, 28, -1][..]));
    }

    #[test]
    #[should_panic(expected = "exactly one")]
    fn int64_singleton_panics_on_empty_list() {
        let mut record = TypedRecord::new();
        record.add_int64_list("label", Vec::new());
        record.int64("label");
    }

    #[test]
    #[should_panic(expected = "exactly one")]
    fn int64_singleton_panics_on_multiple_values() {
        let mut record = TypedRecord::new();
        record.add_int64_list("label", vec![1, 2]);
        record.int64("label");
    }

    #[test]
    fn bytes_singleton_returns_the_payload() {
        let mut record = TypedRecord::new();
        record.add_bytes("txt", &[&b"hello"[..]]);
        assert_eq!(record.bytes("txt"), b"hello");
    }

    #[test]
    #[should_panic(expected = "is not a bytes list")]
    fn bytes_singleton_panics_on_wrong_kind() {
        let mut record = TypedRecord::new();
        record.add_float("img", &[1.0]);
        record.bytes("img");
    }

    #[test]
    fn image_round_trips_through_png_bytes() {
        let mut pixels = RgbImage::new(3, 2);
        pixels.put_pixel(1, 1, Rgb([200, 10, 30]));
        let img = DynamicImage::ImageRgb8(pixels);

        let mut record = TypedRecord::new();
        record.add_image("img", &img).unwrap();
        assert_eq!(record.bytes_list("img").unwrap().len(), 1);

        let decoded = record.image("img").unwrap();
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn retain_prunes_absent_names() {
        let mut record = TypedRecord::new();
        record.add_int64("a", &[1]);
        record.add_int64("b", &[2]);
        record.add_int64("c", &[3]);
        record.retain_features(|name| name != "b");
        assert_eq!(record.feature_names().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
