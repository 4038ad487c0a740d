//! Keep-set producers for samples and typed records.
//!
//! A selection only reports names; pruning happens in the `Selections`
//! transformations, which union the keep-sets of every selection they hold.

use regex::Regex;

use crate::data::Sample;
use crate::errors::PipelineError;
use crate::record::TypedRecord;
use crate::types::{FeatureName, FieldName};

/// Computes which sample fields to keep.
pub trait SampleSelection {
    /// Names of the fields of `sample` to keep.
    fn select_sample(&self, sample: &Sample) -> Vec<FieldName>;
}

/// Computes which record features to keep.
pub trait RecordSelection {
    /// Names of the features of `record` to keep.
    fn select_record(&self, record: &TypedRecord) -> Vec<FeatureName>;
}

impl<F> SampleSelection for F
where
    F: Fn(&Sample) -> Vec<FieldName>,
{
    fn select_sample(&self, sample: &Sample) -> Vec<FieldName> {
        self(sample)
    }
}

impl<F> RecordSelection for F
where
    F: Fn(&TypedRecord) -> Vec<FeatureName>,
{
    fn select_record(&self, record: &TypedRecord) -> Vec<FeatureName> {
        self(record)
    }
}

/// Keeps a fixed list of names (only those actually present are reported).
#[derive(Clone, Debug)]
pub struct KeepKeys {
    keys: Vec<String>,
}

impl KeepKeys {
    /// Keep exactly the listed names.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl SampleSelection for KeepKeys {
    fn select_sample(&self, sample: &Sample) -> Vec<FieldName> {
        self.keys
            .iter()
            .filter(|key| sample.contains(key))
            .cloned()
            .collect()
    }
}

impl RecordSelection for KeepKeys {
    fn select_record(&self, record: &TypedRecord) -> Vec<FeatureName> {
        self.keys
            .iter()
            .filter(|key| record.has_feature(key))
            .cloned()
            .collect()
    }
}

/// Keeps every name starting with a prefix (e.g. `image/`).
#[derive(Clone, Debug)]
pub struct KeepPrefix {
    prefix: String,
}

impl KeepPrefix {
    /// Keep names starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl SampleSelection for KeepPrefix {
    fn select_sample(&self, sample: &Sample) -> Vec<FieldName> {
        matching(sample.field_names(), |name| name.starts_with(&self.prefix))
    }
}

impl RecordSelection for KeepPrefix {
    fn select_record(&self, record: &TypedRecord) -> Vec<FeatureName> {
        matching(record.feature_names(), |name| name.starts_with(&self.prefix))
    }
}

/// Keeps every name matched by a regular expression.
#[derive(Clone, Debug)]
pub struct KeepPattern {
    pattern: Regex,
}

impl KeepPattern {
    /// Compile `pattern`; names it matches anywhere are kept.
    pub fn new(pattern: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl SampleSelection for KeepPattern {
    fn select_sample(&self, sample: &Sample) -> Vec<FieldName> {
        matching(sample.field_names(), |name| self.pattern.is_match(name))
    }
}

impl RecordSelection for KeepPattern {
    fn select_record(&self, record: &TypedRecord) -> Vec<FeatureName> {
        matching(record.feature_names(), |name| self.pattern.is_match(name))
    }
}

fn matching<'a>(
    names: impl Iterator<Item = &'a str>,
    keep: impl Fn(&str) -> bool,
) -> Vec<String> {
    names.filter(|name| keep(name)).map(str::to_owned).collect()
}
