use shardpipe::constants::sample::KEY_FIELD;
use shardpipe::{
    ArchiveDemuxer, DecodeInt, FieldKind, Identity, InMemoryEntries, KeepKeys, KeepPrefix,
    RecordChain, RecordSelections, RecordTransformation, Rename, Sample, SampleChain,
    SampleSelections, SampleToRecord, SampleTransformation, TypedRecord,
};

fn sample_with(fields: &[(&str, &[u8])]) -> Sample {
    fields
        .iter()
        .map(|(name, data)| (*name, data.to_vec()))
        .collect()
}

#[test]
fn identity_any_number_of_times_is_a_noop() {
    let original = sample_with(&[("a", b"1"), ("b", b"2")]);
    let mut current = original.clone();
    for _ in 0..10 {
        current = Identity.transform_sample(current);
    }
    assert_eq!(current, original);

    let mut record = TypedRecord::new();
    record.add_int64("label", &[4]);
    assert_eq!(Identity.transform_record(record.clone()), record);
}

#[test]
fn rename_then_select_keeps_renamed_field() {
    let rename = Rename::new("b", ["a"]);
    let select = SampleSelections::default().with(KeepKeys::new(["b"]));

    let kept = select.transform_sample(rename.transform_sample(sample_with(&[("a", b"1")])));
    assert_eq!(kept, sample_with(&[("b", b"1")]));

    let dropped = rename.transform_sample(select.transform_sample(sample_with(&[("a", b"1")])));
    assert!(dropped.is_empty());
}

#[test]
fn selections_union_rather_than_intersect() {
    let selections = SampleSelections::default()
        .with(KeepKeys::new(["cls"]))
        .with(KeepPrefix::new("seg"));
    let kept = selections.transform_sample(sample_with(&[
        ("cls", b"1"),
        ("jpg", b"2"),
        ("seg.png", b"3"),
        ("seg.json", b"4"),
    ]));
    let mut names: Vec<&str> = kept.field_names().collect();
    names.sort();
    assert_eq!(names, vec!["cls", "seg.json", "seg.png"]);
}

#[test]
fn empty_selection_set_drops_all_fields() {
    let cleared = SampleSelections::default().transform_sample(sample_with(&[("a", b"1")]));
    assert!(cleared.is_empty());
}

#[test]
fn demuxed_samples_flow_through_chain_into_records() {
    let stream: InMemoryEntries = [
        ("0001.cls", b"3".to_vec()),
        ("0001.jpg", b"jpeg-1".to_vec()),
        ("0001.txt", b"a cat".to_vec()),
        ("0002.cls", b"5".to_vec()),
        ("0002.png", b"png-2".to_vec()),
    ]
    .into_iter()
    .collect();

    let chain = SampleChain::new()
        .then(Rename::new("image", ["jpg", "png"]))
        .then(DecodeInt::new(["cls"]))
        .then(SampleSelections::default().with(KeepKeys::new(["image", "cls", KEY_FIELD])));
    let converter = SampleToRecord::new().with_rule("image", FieldKind::Bytes);

    let records: Vec<TypedRecord> = ArchiveDemuxer::new(stream)
        .map(|sample| converter.convert(chain.apply(sample.unwrap()).unwrap()).unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].int64("cls"), 3);
    assert_eq!(records[0].bytes("image"), b"jpeg-1");
    assert_eq!(records[1].int64("cls"), 5);
    assert_eq!(records[1].bytes("image"), b"png-2");
    assert_eq!(records[1].bytes(KEY_FIELD), b"0002");
    assert!(!records[0].has_feature("txt"));
}

#[test]
fn record_chain_prunes_after_rename() {
    let mut record = TypedRecord::new();
    record.add_int64("cls", &[1]);
    record.add_float("score", &[0.9]);
    let chain = RecordChain::new()
        .then(Rename::new("label", ["cls"]))
        .then(RecordSelections::default().with(KeepKeys::new(["label"])));
    let out = chain.transform_record(record);
    assert_eq!(out.feature_names().collect::<Vec<_>>(), vec!["label"]);
    assert_eq!(out.int64("label"), 1);
}

#[test]
#[should_panic]
fn singleton_on_empty_list_fails_loudly() {
    let mut record = TypedRecord::new();
    record.add_int64_list("label", Vec::new());
    record.int64("label");
}

#[test]
#[should_panic]
fn singleton_on_two_values_fails_loudly() {
    let mut record = TypedRecord::new();
    record.add_int64_list("label", vec![1, 2]);
    record.int64("label");
}
