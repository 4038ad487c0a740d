//! Entry-name helpers shared by the demuxer and transports.

use crate::constants::sample::{EXTENSION_SEPARATOR, PATH_SEPARATOR};

/// Split an entry name into `(group_key, field)`.
///
/// The field is the text after the final `.` of the last path component; the
/// key is everything before that dot, earlier dots and directories included.
/// A last component without a dot yields the whole name as key and an empty
/// field.
pub fn split_entry_name(name: &str) -> (&str, &str) {
    let basename_start = name.rfind(PATH_SEPARATOR).map_or(0, |idx| idx + 1);
    match name[basename_start..].rfind(EXTENSION_SEPARATOR) {
        Some(dot) => {
            let dot = basename_start + dot;
            (&name[..dot], &name[dot + 1..])
        }
        None => (name, ""),
    }
}

/// Entry name without its extension.
pub fn strip_extension(name: &str) -> &str {
    split_entry_name(name).0
}

/// Extension of an entry name (empty when there is none).
pub fn extension(name: &str) -> &str {
    split_entry_name(name).1
}

/// True if the last path component starts with a dot (e.g. `._0001.jpg`).
pub fn is_hidden_entry(name: &str) -> bool {
    name.rsplit(PATH_SEPARATOR)
        .next()
        .is_some_and(|basename| basename.starts_with(EXTENSION_SEPARATOR))
}
