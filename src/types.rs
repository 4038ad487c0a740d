/// Field name inside a sample (the archive entry extension).
/// Examples: `cls`, `jpg`, `__key__`
pub type FieldName = String;
/// Feature name inside a typed record.
/// Examples: `image/encoded`, `label`, `__key__`
pub type FeatureName = String;
/// Shared basename tying several archive entries into one sample.
/// Example: `train/n01440764_10026`
pub type GroupKey = String;
/// Full archive entry path as stored in the container.
/// Example: `train/n01440764_10026.jpg`
pub type EntryName = String;
/// Raw archive entry payload.
pub type Payload = Vec<u8>;
