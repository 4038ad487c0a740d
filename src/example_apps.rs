use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing::info;

use crate::config::{Compression, DemuxConfig};
use crate::convert::SampleToRecord;
use crate::data::{Sample, SampleValue, Scalar};
use crate::demux::ArchiveDemuxer;
use crate::framing::RecordWriter;
use crate::selection::KeepKeys;
use crate::transform::{Rename, SampleChain, SampleSelections};
use crate::transport::tarball::open_archive;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Gzip,
    Auto,
}

impl From<CompressionArg> for Compression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::None => Compression::None,
            CompressionArg::Gzip => Compression::Gzip,
            CompressionArg::Auto => Compression::Auto,
        }
    }
}

/// `--rename DEST=SRC[,SRC...]`
#[derive(Debug, Clone)]
struct RenameArg {
    destination: String,
    sources: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(
    name = "inspect_archive",
    disable_help_subcommand = true,
    about = "Demultiplex a sample archive and summarize each sample",
    long_about = "Group archive entries into samples by key, optionally rename and select fields, and optionally write the result as framed typed records.",
    after_help = "Stages run in the order: every --rename, then --keep."
)]
/// CLI for `inspect_archive`.
///
/// Common usage:
/// - Summarize a gzip shard: `inspect_archive shard-000.tar.gz --compression auto`
/// - Promote `jpg` to `image` and keep it with the label: `--rename image=jpg --keep image --keep cls`
/// - Export records: `--records-out /tmp/shard-000.records`
struct InspectArchiveCli {
    #[arg(value_name = "ARCHIVE", help = "Tar archive to demultiplex")]
    archive: PathBuf,
    #[arg(
        long,
        value_enum,
        default_value = "auto",
        help = "Compression layer around the tar stream"
    )]
    compression: CompressionArg,
    #[arg(long = "key-field", help = "Override the reserved key field name")]
    key_field: Option<String>,
    #[arg(long = "skip-hidden", help = "Skip entries whose basename starts with '.'")]
    skip_hidden: bool,
    #[arg(
        long = "rename",
        value_name = "DEST=SRC[,SRC...]",
        value_parser = parse_rename_arg,
        help = "Copy the last present source field to DEST, repeat as needed"
    )]
    renames: Vec<RenameArg>,
    #[arg(
        long = "keep",
        value_name = "FIELD",
        help = "Keep only these fields (plus the key field), repeat as needed"
    )]
    keep: Vec<String>,
    #[arg(long, help = "Stop after this many samples")]
    limit: Option<usize>,
    #[arg(
        long = "records-out",
        value_name = "PATH",
        help = "Write every sample as a framed typed record to PATH"
    )]
    records_out: Option<PathBuf>,
}

/// Run the archive inspection demo with CLI-style arguments (program name excluded).
pub fn run_inspect_archive<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<InspectArchiveCli, _>(
        std::iter::once("inspect_archive".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let mut config = DemuxConfig::default()
        .with_compression(cli.compression.into())
        .with_skip_hidden(cli.skip_hidden);
    if let Some(key_field) = cli.key_field {
        config = config.with_key_field(key_field);
    }

    let mut chain = SampleChain::new();
    for rename in cli.renames {
        chain = chain.then(Rename::new(rename.destination, rename.sources));
    }
    if !cli.keep.is_empty() {
        let mut keep = cli.keep;
        keep.push(config.key_field.to_string());
        chain = chain.then(SampleSelections::default().with(KeepKeys::new(keep)));
    }

    let file = File::open(&cli.archive)?;
    let mut archive = open_archive(BufReader::new(file), config.compression)?;
    let mut demuxer = ArchiveDemuxer::from_tar(&mut archive, &config)?;

    let mut writer = match &cli.records_out {
        Some(path) => Some(RecordWriter::new(BufWriter::new(File::create(path)?))),
        None => None,
    };
    let converter = SampleToRecord::new();
    let limit = cli.limit.unwrap_or(usize::MAX);

    let mut stdout = std::io::stdout().lock();
    while demuxer.samples_emitted() < limit {
        let Some(sample) = demuxer.read()? else {
            break;
        };
        let sample = chain.apply(sample)?;
        writeln!(stdout, "{}", describe_sample(&sample, &config.key_field))?;
        if let Some(writer) = writer.as_mut() {
            writer.write_record(&converter.convert(sample)?)?;
        }
    }

    if let Some(writer) = writer {
        let written = writer.records_written();
        writer.into_inner()?;
        info!(records = written, "records written");
    }
    info!(
        archive = %cli.archive.display(),
        samples = demuxer.samples_emitted(),
        "archive inspected"
    );
    Ok(())
}

fn describe_sample(sample: &Sample, key_field: &str) -> String {
    let key = match sample.get(key_field) {
        Some(SampleValue::Scalar(Scalar::Text(key))) => key.as_str(),
        _ => "<no key>",
    };
    let fields: Vec<String> = sample
        .iter()
        .filter(|(name, _)| *name != key_field)
        .map(|(name, value)| format!("{name}:{}", describe_value(value)))
        .collect();
    format!("{key} [{}]", fields.join(", "))
}

fn describe_value(value: &SampleValue) -> String {
    match value {
        SampleValue::Bytes(bytes) => format!("{}B", bytes.len()),
        SampleValue::Image(img) => format!("{}x{}", img.width(), img.height()),
        SampleValue::Scalar(Scalar::Int(value)) => value.to_string(),
        SampleValue::Scalar(Scalar::Float(value)) => value.to_string(),
        SampleValue::Scalar(Scalar::Text(text)) => format!("{text:?}"),
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_rename_arg(raw: &str) -> Result<RenameArg, String> {
    let (destination, sources) = raw
        .split_once('=')
        .ok_or_else(|| "--rename expects DEST=SRC[,SRC...]".to_string())?;
    let destination = destination.trim();
    let sources: Vec<String> = sources
        .split(',')
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .map(str::to_string)
        .collect();
    if destination.is_empty() || sources.is_empty() {
        return Err("--rename needs a destination and at least one source".to_string());
    }
    Ok(RenameArg {
        destination: destination.to_string(),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::RecordReader;
    use tempfile::tempdir;

    fn write_tar(path: &std::path::Path, entries: &[(&str, &[u8])]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.finish().unwrap();
    }

    #[test]
    fn rename_arg_parses_sources() {
        let arg = parse_rename_arg("image=jpg, png").unwrap();
        assert_eq!(arg.destination, "image");
        assert_eq!(arg.sources, vec!["jpg".to_string(), "png".to_string()]);
        assert!(parse_rename_arg("image").is_err());
        assert!(parse_rename_arg("=jpg").is_err());
        assert!(parse_rename_arg("image=").is_err());
    }

    #[test]
    fn describe_sample_lists_non_key_fields() {
        let mut sample = Sample::new();
        sample.insert("cls", b"3".to_vec());
        sample.insert("label", Scalar::Int(3));
        sample.set_key("0001");
        assert_eq!(
            describe_sample(&sample, crate::constants::sample::KEY_FIELD),
            "0001 [cls:1B, label:3]"
        );
    }

    #[test]
    fn inspect_archive_writes_selected_records() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("shard.tar");
        let records = dir.path().join("shard.records");
        write_tar(
            &archive,
            &[
                ("0001.cls", b"1"),
                ("0001.jpg", b"a"),
                ("0002.cls", b"2"),
                ("0002.jpg", b"b"),
            ],
        );

        run_inspect_archive(
            [
                archive.to_string_lossy().into_owned(),
                "--rename".to_string(),
                "image=jpg".to_string(),
                "--keep".to_string(),
                "image".to_string(),
                "--records-out".to_string(),
                records.to_string_lossy().into_owned(),
            ]
            .into_iter(),
        )
        .unwrap();

        let reader = RecordReader::new(File::open(&records).unwrap());
        let written: Vec<_> = reader.map(|record| record.unwrap()).collect();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].bytes("image"), b"a");
        assert_eq!(written[1].bytes("__key__"), b"0002");
        assert!(!written[0].has_feature("cls"));
        assert!(!written[0].has_feature("jpg"));
    }
}
