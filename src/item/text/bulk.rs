//! Whole-file line operations built on [`LineReader`] and [`LineItemWriter`].
//!
//! [`LineItemWriter`]: super::line_writer::LineItemWriter

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    core::item::ItemWriter,
    error::{check_path, ArgumentError, BatchError},
};

use super::{
    encoding::Encoding,
    line_reader::{LineReader, LineReaderBuilder, DEFAULT_CAPACITY},
    line_writer::{AsLine, LineItemWriterBuilder, LineTerminator, WriteMode},
};

/// Settings shared by the read functions.
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Encoding used when the file has no BOM. `None` means UTF-8.
    pub encoding: Option<Encoding>,
    /// See [`LineReaderBuilder::detect_bom`].
    pub detect_bom: bool,
    pub capacity: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            detect_bom: true,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ReadOptions {
    fn builder<P: AsRef<Path>>(&self, path: P) -> LineReaderBuilder {
        let builder = LineReaderBuilder::new()
            .path(path)
            .detect_bom(self.detect_bom)
            .capacity(self.capacity);
        match self.encoding {
            Some(encoding) => builder.encoding(encoding),
            None => builder,
        }
    }
}

/// Settings shared by the write functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub mode: WriteMode,
    /// `None` means UTF-8 without BOM.
    pub encoding: Option<Encoding>,
    pub terminator: LineTerminator,
}

impl WriteOptions {
    pub fn overwrite() -> Self {
        Self::default()
    }

    pub fn append() -> Self {
        Self {
            mode: WriteMode::Append,
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    fn builder<P: AsRef<Path>>(&self, path: P) -> LineItemWriterBuilder {
        let builder = LineItemWriterBuilder::new()
            .path(path)
            .mode(self.mode)
            .terminator(self.terminator);
        match self.encoding {
            Some(encoding) => builder.encoding(encoding),
            None => builder,
        }
    }
}

/// Returns a restartable, lazily opened line source for `path`.
///
/// Only the arguments are checked here; the file is opened by each
/// enumeration.
pub fn read_lines<P: AsRef<Path>>(
    path: P,
    encoding: Option<Encoding>,
) -> Result<LineReader, BatchError> {
    let options = ReadOptions {
        encoding,
        ..ReadOptions::default()
    };
    read_lines_with(path, &options)
}

pub fn read_lines_with<P: AsRef<Path>>(
    path: P,
    options: &ReadOptions,
) -> Result<LineReader, BatchError> {
    options.builder(path).build()
}

/// Reads every line of `path`.
///
/// The file handle is closed before this function returns, on success and on
/// error alike.
///
/// # Examples
///
/// ```
/// use batch_lines::item::text::{read_all_lines, write_all_lines, WriteMode};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("names.txt");
///
/// write_all_lines(&path, &["ada", "grace"], WriteMode::Overwrite, None).unwrap();
/// assert_eq!(read_all_lines(&path, None).unwrap(), vec!["ada", "grace"]);
/// ```
pub fn read_all_lines<P: AsRef<Path>>(
    path: P,
    encoding: Option<Encoding>,
) -> Result<Vec<String>, BatchError> {
    let options = ReadOptions {
        encoding,
        ..ReadOptions::default()
    };
    read_all_lines_with(path, &options)
}

pub fn read_all_lines_with<P: AsRef<Path>>(
    path: P,
    options: &ReadOptions,
) -> Result<Vec<String>, BatchError> {
    let reader = read_lines_with(path, options)?;
    let mut session = reader.open()?;
    let lines = session.by_ref().collect::<Result<Vec<_>, _>>();
    session.close();
    lines
}

/// Writes `lines` to `path`, one per line, in the given mode.
///
/// The file is created when missing. An empty slice still creates (or, with
/// `Overwrite`, empties) the file.
pub fn write_all_lines<P: AsRef<Path>, L: AsLine>(
    path: P,
    lines: &[L],
    mode: WriteMode,
    encoding: Option<Encoding>,
) -> Result<(), BatchError> {
    let options = WriteOptions {
        mode,
        encoding,
        ..WriteOptions::default()
    };
    write_all_lines_with(path, lines, &options)
}

/// Appends `lines` to `path`, creating it when missing.
pub fn append_all_lines<P: AsRef<Path>, L: AsLine>(
    path: P,
    lines: &[L],
    encoding: Option<Encoding>,
) -> Result<(), BatchError> {
    write_all_lines(path, lines, WriteMode::Append, encoding)
}

pub fn write_all_lines_with<P: AsRef<Path>, L: AsLine>(
    path: P,
    lines: &[L],
    options: &WriteOptions,
) -> Result<(), BatchError> {
    let path = path.as_ref();
    let writer = options.builder(path).build()?;
    writer.write(lines)?;
    writer.close()?;

    info!(
        "Wrote {} line(s) to {} ({:?})",
        lines.len(),
        path.display(),
        options.mode
    );
    Ok(())
}

/// Like [`write_all_lines_with`], for callers holding an optional sequence.
///
/// A missing sequence fails with `InvalidArgument(Null("lines"))` once the
/// path has been checked, without touching the filesystem.
pub fn write_all_lines_opt<P: AsRef<Path>, L: AsLine>(
    path: P,
    lines: Option<&[L]>,
    options: &WriteOptions,
) -> Result<(), BatchError> {
    let path = path.as_ref();
    check_path(path)?;
    let lines = lines.ok_or(ArgumentError::Null("lines"))?;
    write_all_lines_with(path, lines, options)
}
