//! Archive encodings.
//!
//! Writing goes through the [`ArchiveWriter`] trait so the package builder
//! stays format-agnostic. Reading is a single [`extract`] entry point keyed by
//! [`CompressionAlgorithm`].

use crate::core::path::native_path;
use crate::core::{CompressionAlgorithm, ShelfError, ShelfResult};
use crate::fs::to_archive_path;
use chrono::{DateTime, Datelike, Timelike, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const FILE_MODE: u32 = 0o644;

/// Per-entry header handed to an [`ArchiveWriter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Archive-relative, `/`-separated path
    pub path: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Streaming archive sink accepting (header, body) pairs
pub trait ArchiveWriter {
    /// Write one entry. `body` must yield exactly `header.size` bytes.
    fn append(&mut self, header: &EntryHeader, body: &mut dyn Read) -> ShelfResult<()>;

    /// Flush trailers and compression frames. The archive is incomplete until this succeeds.
    fn finish(self: Box<Self>) -> ShelfResult<()>;
}

/// Create the writer for `algorithm` on top of `output`
pub fn archive_writer(
    algorithm: CompressionAlgorithm,
    output: File,
) -> ShelfResult<Box<dyn ArchiveWriter>> {
    let writer: Box<dyn ArchiveWriter> = match algorithm {
        CompressionAlgorithm::Zstd => {
            let encoder = zstd::Encoder::new(output, 0).map_err(archive_error)?;
            Box::new(TarArchiveWriter::new(TarSink::Zstd(encoder)))
        }
        CompressionAlgorithm::Gzip => Box::new(TarArchiveWriter::new(TarSink::Gzip(
            GzEncoder::new(output, Compression::default()),
        ))),
        CompressionAlgorithm::Uncompressed => {
            Box::new(TarArchiveWriter::new(TarSink::Plain(output)))
        }
        CompressionAlgorithm::Zip => Box::new(ZipArchiveWriter {
            writer: ZipWriter::new(output),
        }),
    };
    Ok(writer)
}

fn archive_error(e: impl std::fmt::Display) -> ShelfError {
    ShelfError::Archive(e.to_string())
}

enum TarSink {
    Plain(File),
    Gzip(GzEncoder<File>),
    Zstd(zstd::Encoder<'static, File>),
}

impl TarSink {
    fn finish(self) -> io::Result<File> {
        match self {
            TarSink::Plain(file) => Ok(file),
            TarSink::Gzip(encoder) => encoder.finish(),
            TarSink::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl Write for TarSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarSink::Plain(file) => file.write(buf),
            TarSink::Gzip(encoder) => encoder.write(buf),
            TarSink::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarSink::Plain(file) => file.flush(),
            TarSink::Gzip(encoder) => encoder.flush(),
            TarSink::Zstd(encoder) => encoder.flush(),
        }
    }
}

struct TarArchiveWriter {
    builder: tar::Builder<TarSink>,
}

impl TarArchiveWriter {
    fn new(sink: TarSink) -> Self {
        Self {
            builder: tar::Builder::new(sink),
        }
    }
}

impl ArchiveWriter for TarArchiveWriter {
    fn append(&mut self, header: &EntryHeader, body: &mut dyn Read) -> ShelfResult<()> {
        let mut tar_header = tar::Header::new_gnu();
        tar_header.set_entry_type(tar::EntryType::Regular);
        tar_header.set_size(header.size);
        tar_header.set_mode(FILE_MODE);
        tar_header.set_mtime(unix_seconds(header.modified));

        self.builder
            .append_data(&mut tar_header, &header.path, body)
            .map_err(|e| ShelfError::Archive(format!("failed to write {}: {}", header.path, e)))
    }

    fn finish(self: Box<Self>) -> ShelfResult<()> {
        let sink = self.builder.into_inner().map_err(archive_error)?;
        let file = sink.finish().map_err(archive_error)?;
        file.sync_all()?;
        Ok(())
    }
}

struct ZipArchiveWriter {
    writer: ZipWriter<File>,
}

impl ArchiveWriter for ZipArchiveWriter {
    fn append(&mut self, header: &EntryHeader, body: &mut dyn Read) -> ShelfResult<()> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(FILE_MODE)
            .last_modified_time(zip_time(header.modified))
            .large_file(header.size >= u64::from(u32::MAX));

        self.writer
            .start_file(header.path.as_str(), options)
            .map_err(|e| ShelfError::Archive(format!("failed to write {}: {}", header.path, e)))?;
        io::copy(body, &mut self.writer)
            .map_err(|e| ShelfError::Archive(format!("failed to write {}: {}", header.path, e)))?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> ShelfResult<()> {
        let file = self.writer.finish().map_err(archive_error)?;
        file.sync_all()?;
        Ok(())
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Zip timestamps cover 1980..=2107; anything else falls back to the zip epoch.
fn zip_time(time: SystemTime) -> zip::DateTime {
    let utc: DateTime<Utc> = time.into();
    let (Ok(year), Ok(month), Ok(day), Ok(hour), Ok(minute), Ok(second)) = (
        u16::try_from(utc.year()),
        u8::try_from(utc.month()),
        u8::try_from(utc.day()),
        u8::try_from(utc.hour()),
        u8::try_from(utc.minute()),
        u8::try_from(utc.second()),
    ) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(year, month, day, hour, minute, second).unwrap_or_default()
}

/// Extract every file of an encoded archive under `destination`.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// failure never leaves a partially-written file under its final name. Files
/// extracted before a failure stay in place; the resolver's next run finds them
/// through the integrity checks. Returns the archive paths in archive order.
pub fn extract(
    algorithm: CompressionAlgorithm,
    archive: &[u8],
    destination: &Path,
) -> ShelfResult<Vec<String>> {
    fs::create_dir_all(destination)?;

    match algorithm {
        CompressionAlgorithm::Zstd => {
            let decoder = zstd::Decoder::new(archive).map_err(archive_error)?;
            extract_tar(decoder, destination)
        }
        CompressionAlgorithm::Gzip => extract_tar(GzDecoder::new(archive), destination),
        CompressionAlgorithm::Uncompressed => extract_tar(archive, destination),
        CompressionAlgorithm::Zip => extract_zip(archive, destination),
    }
}

fn extract_tar<R: Read>(reader: R, destination: &Path) -> ShelfResult<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            continue;
        }

        let raw_path = entry.path().map_err(archive_error)?.into_owned();
        if !entry_type.is_file() {
            return Err(ShelfError::Archive(format!(
                "unsupported entry type for {}",
                raw_path.display()
            )));
        }

        let archive_path = checked_archive_path(&raw_path)?;
        write_entry(destination, &archive_path, &mut entry)?;
        extracted.push(archive_path);
    }

    Ok(extracted)
}

fn extract_zip(archive: &[u8], destination: &Path) -> ShelfResult<Vec<String>> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(archive_error)?;
    let mut extracted = Vec::new();

    for index in 0..zip.len() {
        let mut file = zip.by_index(index).map_err(archive_error)?;
        if file.is_dir() {
            continue;
        }

        let raw_path = file
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                ShelfError::Archive(format!("path traversal detected: {}", file.name()))
            })?;
        let archive_path = checked_archive_path(&raw_path)?;
        write_entry(destination, &archive_path, &mut file)?;
        extracted.push(archive_path);
    }

    Ok(extracted)
}

/// Reject absolute paths and `..` components
fn checked_archive_path(path: &Path) -> ShelfResult<String> {
    let archive_path = to_archive_path(path)
        .map_err(|_| ShelfError::Archive(format!("path traversal detected: {}", path.display())))?;
    if archive_path.is_empty() {
        return Err(ShelfError::Archive("archive entry with empty path".to_string()));
    }
    Ok(archive_path)
}

fn write_entry(destination: &Path, archive_path: &str, body: &mut dyn Read) -> ShelfResult<()> {
    let target = native_path(destination, archive_path);
    let parent = target
        .parent()
        .ok_or_else(|| ShelfError::Path(format!("{} has no parent", target.display())))?;
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    io::copy(body, staged.as_file_mut())
        .map_err(|e| ShelfError::Archive(format!("failed to extract {}: {}", archive_path, e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    }

    // A directory left behind by an earlier layout; a populated one still fails
    if target.is_dir() {
        fs::remove_dir(&target)?;
    }
    staged.persist(&target).map_err(|e| ShelfError::Io(e.error))?;
    Ok(())
}
