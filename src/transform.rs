//! Composable sample and record transformations.
//!
//! Ownership: every transformation takes exclusive ownership of its input,
//! mutates it in place, and hands the same value back. Callers never keep a
//! copy of the "before" state unless they clone it themselves.

use std::collections::HashSet;

use crate::data::Sample;
use crate::errors::PipelineError;
use crate::record::TypedRecord;
use crate::selection::{RecordSelection, SampleSelection};
use crate::types::FieldName;

/// Maps one sample to a (possibly mutated) sample.
pub trait SampleTransformation {
    /// Transform `sample`, returning the same value.
    fn transform_sample(&self, sample: Sample) -> Sample;
}

/// Maps one typed record to a (possibly mutated) record.
pub trait RecordTransformation {
    /// Transform `record`, returning the same value.
    fn transform_record(&self, record: TypedRecord) -> TypedRecord;
}

/// Sample transformation that may fail (decoding, parsing).
///
/// Every [`SampleTransformation`] is also an infallible
/// `TrySampleTransformation`, so chains can mix both.
pub trait TrySampleTransformation {
    /// Transform `sample`, or fail without a partial result.
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError>;
}

impl<T: SampleTransformation + ?Sized> TrySampleTransformation for T {
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError> {
        Ok(self.transform_sample(sample))
    }
}

/// Returns its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl SampleTransformation for Identity {
    fn transform_sample(&self, sample: Sample) -> Sample {
        sample
    }
}

impl RecordTransformation for Identity {
    fn transform_record(&self, record: TypedRecord) -> TypedRecord {
        record
    }
}

/// Copies the value of each present source name to `destination`.
///
/// Sources are visited in order, so the last present source wins. Missing
/// sources are skipped. Sources are left in place; pair with a selection to
/// drop them.
#[derive(Clone, Debug)]
pub struct Rename {
    destination: FieldName,
    sources: Vec<FieldName>,
}

impl Rename {
    /// Copy each present name in `sources`, in order, into `destination`.
    pub fn new<I, S>(destination: impl Into<FieldName>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            destination: destination.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

impl SampleTransformation for Rename {
    fn transform_sample(&self, mut sample: Sample) -> Sample {
        for source in &self.sources {
            if let Some(value) = sample.get(source).cloned() {
                sample.insert(self.destination.clone(), value);
            }
        }
        sample
    }
}

impl RecordTransformation for Rename {
    fn transform_record(&self, mut record: TypedRecord) -> TypedRecord {
        for source in &self.sources {
            if let Some(feature) = record.feature(source).cloned() {
                record.set_feature(self.destination.clone(), feature);
            }
        }
        record
    }
}

/// Keeps the union of the fields chosen by its selections and drops the rest.
///
/// With no selections nothing is kept.
#[derive(Default)]
pub struct SampleSelections {
    selections: Vec<Box<dyn SampleSelection>>,
}

impl SampleSelections {
    /// Union of `selections`; an empty list keeps nothing.
    pub fn new(selections: Vec<Box<dyn SampleSelection>>) -> Self {
        Self { selections }
    }

    /// Append another selection to the union.
    pub fn with(mut self, selection: impl SampleSelection + 'static) -> Self {
        self.selections.push(Box::new(selection));
        self
    }
}

impl SampleTransformation for SampleSelections {
    fn transform_sample(&self, mut sample: Sample) -> Sample {
        let keep: HashSet<FieldName> = self
            .selections
            .iter()
            .flat_map(|selection| selection.select_sample(&sample))
            .collect();
        sample.retain(|name| keep.contains(name));
        sample
    }
}

/// Record counterpart of [`SampleSelections`].
#[derive(Default)]
pub struct RecordSelections {
    selections: Vec<Box<dyn RecordSelection>>,
}

impl RecordSelections {
    /// Union of `selections`; an empty list keeps nothing.
    pub fn new(selections: Vec<Box<dyn RecordSelection>>) -> Self {
        Self { selections }
    }

    /// Append another selection to the union.
    pub fn with(mut self, selection: impl RecordSelection + 'static) -> Self {
        self.selections.push(Box::new(selection));
        self
    }
}

impl RecordTransformation for RecordSelections {
    fn transform_record(&self, mut record: TypedRecord) -> TypedRecord {
        let keep: HashSet<FieldName> = self
            .selections
            .iter()
            .flat_map(|selection| selection.select_record(&record))
            .collect();
        record.retain_features(|name| keep.contains(name));
        record
    }
}

/// Ordered sample pipeline; stages run strictly left to right.
#[derive(Default)]
pub struct SampleChain {
    stages: Vec<Box<dyn TrySampleTransformation>>,
}

impl SampleChain {
    /// Empty chain; applying it returns the sample unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the end of the chain.
    pub fn then(mut self, stage: impl TrySampleTransformation + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn apply(&self, sample: Sample) -> Result<Sample, PipelineError> {
        self.stages
            .iter()
            .try_fold(sample, |sample, stage| stage.try_transform_sample(sample))
    }
}

// Not a blanket `SampleTransformation`: a chain may hold fallible stages.
impl TrySampleTransformation for SampleChain {
    fn try_transform_sample(&self, sample: Sample) -> Result<Sample, PipelineError> {
        self.apply(sample)
    }
}

/// Ordered record pipeline; stages run strictly left to right.
#[derive(Default)]
pub struct RecordChain {
    stages: Vec<Box<dyn RecordTransformation>>,
}

impl RecordChain {
    /// Empty chain; applying it returns the record unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the end of the chain.
    pub fn then(mut self, stage: impl RecordTransformation + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl RecordTransformation for RecordChain {
    fn transform_record(&self, record: TypedRecord) -> TypedRecord {
        self.stages
            .iter()
            .fold(record, |record, stage| stage.transform_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::KeepKeys;

    fn sample() -> Sample {
        [("a", b"1".to_vec()), ("c", b"3".to_vec())]
            .into_iter()
            .collect()
    }

    #[test]
    fn identity_is_idempotent() {
        let original = sample();
        let mut current = original.clone();
        for _ in 0..5 {
            current = Identity.transform_sample(current);
        }
        assert_eq!(current, original);
    }

    #[test]
    fn rename_copies_last_present_source() {
        let renamed = Rename::new("b", ["a", "missing", "c"]).transform_sample(sample());
        assert_eq!(renamed.bytes("b"), Some(&b"3"[..]));
        assert_eq!(renamed.bytes("a"), Some(&b"1"[..]));
        assert_eq!(renamed.len(), 3);
    }

    #[test]
    fn rename_with_no_present_source_is_noop() {
        let renamed = Rename::new("b", ["x", "y"]).transform_sample(sample());
        assert_eq!(renamed, sample());
    }

    #[test]
    fn selections_keep_union_of_keep_sets() {
        let selections = SampleSelections::default()
            .with(KeepKeys::new(["a"]))
            .with(KeepKeys::new(["c", "a"]));
        let kept = selections.transform_sample(sample());
        assert_eq!(kept, sample());

        let only_a = SampleSelections::default()
            .with(KeepKeys::new(["a"]))
            .transform_sample(sample());
        assert_eq!(only_a.field_names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn empty_selections_drop_everything() {
        assert!(SampleSelections::default()
            .transform_sample(sample())
            .is_empty());

        let mut record = TypedRecord::new();
        record.add_int64("label", &[1]);
        assert!(RecordSelections::default()
            .transform_record(record)
            .is_empty());
    }

    #[test]
    fn rename_before_selection_keeps_renamed_field() {
        let rename_then_select = SampleChain::new()
            .then(Rename::new("b", ["a"]))
            .then(SampleSelections::default().with(KeepKeys::new(["b"])));
        let kept = rename_then_select.apply(sample()).unwrap();
        assert_eq!(kept.field_names().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(kept.bytes("b"), Some(&b"1"[..]));

        let select_then_rename = SampleChain::new()
            .then(SampleSelections::default().with(KeepKeys::new(["b"])))
            .then(Rename::new("b", ["a"]));
        assert!(select_then_rename.apply(sample()).unwrap().is_empty());
    }

    #[test]
    fn record_rename_and_selection_compose_in_order() {
        let mut record = TypedRecord::new();
        record.add_int64("cls", &[7]);
        record.add_bytes("jpg", &[&b"img"[..]]);
        let chain = RecordChain::new()
            .then(Rename::new("label", ["cls"]))
            .then(RecordSelections::default().with(KeepKeys::new(["label", "jpg"])));
        assert_eq!(chain.len(), 2);

        let out = chain.transform_record(record);
        assert_eq!(out.int64("label"), 7);
        assert!(!out.has_feature("cls"));
        assert_eq!(out.bytes("jpg"), b"img");
    }

    #[test]
    fn chains_nest() {
        let inner = SampleChain::new().then(Rename::new("b", ["a"]));
        let outer = SampleChain::new().then(inner).then(Identity);
        let out = outer.apply(sample()).unwrap();
        assert!(out.contains("b"));
    }
}
