use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    error::{check_path, ArgumentError, BatchError},
};

use super::encoding::Encoding;

/// How a writer treats content already present in the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Truncate the file before writing.
    #[default]
    Overwrite,
    /// Keep existing content and write after it.
    Append,
}

/// Terminator written after every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// `\r\n` on Windows, `\n` elsewhere.
    #[default]
    Native,
    Lf,
    CrLf,
    Cr,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Native if cfg!(windows) => "\r\n",
            LineTerminator::Native | LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
            LineTerminator::Cr => "\r",
        }
    }
}

/// Text of one line to write.
///
/// `None` stands for a null line and is written as an empty line.
pub trait AsLine {
    fn as_line(&self) -> &str;
}

impl AsLine for str {
    fn as_line(&self) -> &str {
        self
    }
}

impl AsLine for String {
    fn as_line(&self) -> &str {
        self
    }
}

impl AsLine for Cow<'_, str> {
    fn as_line(&self) -> &str {
        self
    }
}

impl<T: AsLine + ?Sized> AsLine for &T {
    fn as_line(&self) -> &str {
        (**self).as_line()
    }
}

impl<T: AsLine> AsLine for Option<T> {
    fn as_line(&self) -> &str {
        self.as_ref().map_or("", |line| line.as_line())
    }
}

/// A writer that emits one line per item, each followed by a terminator.
///
/// Lines are encoded with the configured [`Encoding`]. The encoding's
/// byte-order mark, if it has one, is written once at the start of the file
/// when the writer is built.
///
/// The handle is released by [`close`](Self::close), which flushes first, or
/// when the writer is dropped.
///
/// # Examples
///
/// ```
/// use batch_lines::core::item::ItemWriter;
/// use batch_lines::item::text::line_writer::{LineItemWriterBuilder, LineTerminator};
///
/// let writer = LineItemWriterBuilder::new()
///     .terminator(LineTerminator::Lf)
///     .from_writer(Vec::new())
///     .unwrap();
///
/// writer.write(&[Some("first"), None, Some("third")]).unwrap();
///
/// let bytes = writer.into_inner().unwrap();
/// assert_eq!(String::from_utf8(bytes).unwrap(), "first\n\nthird\n");
/// ```
#[derive(Debug)]
pub struct LineItemWriter<W: Write> {
    path: Option<PathBuf>,
    stream: RefCell<Option<BufWriter<W>>>,
    encoding: Encoding,
    terminator: LineTerminator,
    write_count: Cell<usize>,
}

impl<W: Write> LineItemWriter<W> {
    fn new(
        stream: W,
        path: Option<PathBuf>,
        encoding: Encoding,
        terminator: LineTerminator,
    ) -> Self {
        Self {
            path,
            stream: RefCell::new(Some(BufWriter::new(stream))),
            encoding,
            terminator,
            write_count: Cell::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of lines written so far.
    pub fn write_count(&self) -> usize {
        self.write_count.get()
    }

    pub fn is_open(&self) -> bool {
        self.stream.borrow().is_some()
    }

    fn io_error(&self, error: io::Error) -> BatchError {
        match &self.path {
            Some(path) => BatchError::from_io(error, path),
            None => BatchError::Io(error),
        }
    }

    fn closed_error() -> BatchError {
        BatchError::ItemWriter("line writer is closed".to_string())
    }

    fn write_preamble(&self) -> ItemWriterResult {
        let preamble = self.encoding.preamble();
        if preamble.is_empty() {
            return Ok(());
        }

        let mut stream = self.stream.borrow_mut();
        let stream = stream.as_mut().ok_or_else(Self::closed_error)?;
        stream.write_all(preamble).map_err(|e| self.io_error(e))
    }

    /// Flushes buffered lines to the underlying stream.
    pub fn flush(&self) -> ItemWriterResult {
        if let Some(stream) = self.stream.borrow_mut().as_mut() {
            stream.flush().map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    /// Flushes and releases the stream. Calling it again does nothing.
    pub fn close(&self) -> ItemWriterResult {
        let Some(mut stream) = self.stream.borrow_mut().take() else {
            return Ok(());
        };

        let result = stream.flush().map_err(|e| self.io_error(e));
        drop(stream);
        debug!(
            "Closed line writer on {} after {} line(s)",
            self.describe(),
            self.write_count.get()
        );
        result
    }

    /// Flushes and returns the underlying stream.
    pub fn into_inner(self) -> Result<W, BatchError> {
        let stream = self
            .stream
            .borrow_mut()
            .take()
            .ok_or_else(Self::closed_error)?;
        stream.into_inner().map_err(|e| self.io_error(e.into_error()))
    }

    fn describe(&self) -> Cow<'_, str> {
        match &self.path {
            Some(path) => path.to_string_lossy(),
            None => Cow::Borrowed("<stream>"),
        }
    }
}

impl<W: Write, L: AsLine> ItemWriter<L> for LineItemWriter<W> {
    /// Writes each item followed by the line terminator.
    ///
    /// # Errors
    /// - `ItemWriter` if the writer was already closed
    /// - `AccessDenied`, `IoBusy` or `Io` if the stream rejects the bytes
    fn write(&self, items: &[L]) -> ItemWriterResult {
        let mut stream = self.stream.borrow_mut();
        let stream = stream.as_mut().ok_or_else(Self::closed_error)?;

        let terminator = self.terminator.as_str();
        let mut bytes = Vec::new();
        for item in items {
            bytes.clear();
            self.encoding.encode(item.as_line(), &mut bytes);
            self.encoding.encode(terminator, &mut bytes);
            stream.write_all(&bytes).map_err(|e| self.io_error(e))?;
            self.write_count.set(self.write_count.get() + 1);
        }
        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        LineItemWriter::flush(self)
    }

    fn close(&self) -> ItemWriterResult {
        LineItemWriter::close(self)
    }
}

impl<W: Write> Drop for LineItemWriter<W> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("Failed to flush line writer on drop: {}", error);
        }
    }
}

/// A builder for [`LineItemWriter`]s.
///
/// # Default Configuration
///
/// - Mode: [`WriteMode::Overwrite`]
/// - Encoding: UTF-8 without BOM
/// - Terminator: [`LineTerminator::Native`]
///
/// # Examples
///
/// ```
/// use batch_lines::core::item::ItemWriter;
/// use batch_lines::item::text::line_writer::{LineItemWriterBuilder, WriteMode};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("log.txt");
///
/// for entry in ["started", "stopped"] {
///     let writer = LineItemWriterBuilder::new()
///         .path(&path)
///         .mode(WriteMode::Append)
///         .build()
///         .unwrap();
///     writer.write(&[entry]).unwrap();
///     writer.close().unwrap();
/// }
///
/// let content = std::fs::read_to_string(&path).unwrap();
/// assert_eq!(content.lines().collect::<Vec<_>>(), vec!["started", "stopped"]);
/// ```
#[derive(Debug)]
pub struct LineItemWriterBuilder {
    path: Option<PathBuf>,
    mode: WriteMode,
    // `Some(None)` records an encoding that was explicitly cleared
    encoding: Option<Option<Encoding>>,
    terminator: LineTerminator,
}

impl Default for LineItemWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemWriterBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            mode: WriteMode::default(),
            encoding: None,
            terminator: LineTerminator::default(),
        }
    }

    /// Sets the target file.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the output encoding. Passing `None` makes the build fail.
    pub fn encoding<E: Into<Option<Encoding>>>(mut self, encoding: E) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    fn resolve_encoding(&self) -> Result<Encoding, BatchError> {
        match self.encoding {
            None => Ok(Encoding::default()),
            Some(Some(encoding)) => Ok(encoding),
            Some(None) => Err(ArgumentError::Null("encoding").into()),
        }
    }

    /// Validates the configuration, then opens (creating if needed) the file.
    ///
    /// `Overwrite` truncates the file and writes the encoding's BOM.
    /// `Append` positions at the end and writes the BOM only if the file is
    /// empty.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(Null("path"))`, `InvalidArgument(Empty("path"))` or
    ///   `InvalidArgument(Null("encoding"))` before anything is opened
    /// - `NotFound` if the parent directory does not exist
    /// - `AccessDenied` if the file is read-only or not writable
    /// - `IoBusy` if another handle holds an incompatible lock (Windows only)
    pub fn build(self) -> Result<LineItemWriter<File>, BatchError> {
        let path = self.path.clone().ok_or(ArgumentError::Null("path"))?;
        check_path(&path)?;
        let encoding = self.resolve_encoding()?;

        let mut options = File::options();
        options.write(true).create(true);
        match self.mode {
            WriteMode::Overwrite => {
                options.truncate(true);
            }
            WriteMode::Append => {
                options.append(true);
            }
        }

        let file = options.open(&path).map_err(|e| {
            error!("Failed to open line file {} for writing: {}", path.display(), e);
            BatchError::from_io(e, &path)
        })?;

        let at_start = match self.mode {
            WriteMode::Overwrite => true,
            WriteMode::Append => {
                file.metadata()
                    .map_err(|e| BatchError::from_io(e, &path))?
                    .len()
                    == 0
            }
        };

        debug!(
            "Opened line writer on {} ({:?}, {})",
            path.display(),
            self.mode,
            encoding
        );
        let writer = LineItemWriter::new(file, Some(path), encoding, self.terminator);
        if at_start {
            writer.write_preamble()?;
        }
        Ok(writer)
    }

    /// Creates a writer over any `Write` sink.
    ///
    /// The BOM is written up front in `Overwrite` mode; in `Append` mode the
    /// sink is assumed to already hold content.
    pub fn from_writer<W: Write>(self, wtr: W) -> Result<LineItemWriter<W>, BatchError> {
        let encoding = self.resolve_encoding()?;
        let writer = LineItemWriter::new(wtr, None, encoding, self.terminator);
        if self.mode == WriteMode::Overwrite {
            writer.write_preamble()?;
        }
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn null_lines_are_written_empty() {
        let writer = LineItemWriterBuilder::new()
            .terminator(LineTerminator::CrLf)
            .from_writer(Vec::new())
            .unwrap();

        let lines: Vec<Option<String>> = vec![Some("a".to_string()), None, Some(String::new())];
        writer.write(&lines).unwrap();
        assert_eq!(writer.write_count(), 3);
        assert_eq!(writer.into_inner().unwrap(), b"a\r\n\r\n\r\n");
    }

    #[test]
    fn encoding_applies_to_terminators_too() {
        let writer = LineItemWriterBuilder::new()
            .encoding(Encoding::Utf16Le)
            .terminator(LineTerminator::Lf)
            .from_writer(Vec::new())
            .unwrap();

        writer.write(&["hi"]).unwrap();
        assert_eq!(
            writer.into_inner().unwrap(),
            vec![0xFF, 0xFE, b'h', 0, b'i', 0, b'\n', 0]
        );
    }

    #[test]
    fn append_to_sink_skips_the_bom() {
        let writer = LineItemWriterBuilder::new()
            .mode(WriteMode::Append)
            .encoding(Encoding::Utf8Bom)
            .terminator(LineTerminator::Lf)
            .from_writer(Vec::new())
            .unwrap();

        writer.write(&["x"]).unwrap();
        assert_eq!(writer.into_inner().unwrap(), b"x\n");
    }

    #[test]
    fn native_terminator_follows_the_platform() {
        let expected = if cfg!(windows) { "\r\n" } else { "\n" };
        assert_eq!(LineTerminator::Native.as_str(), expected);
        assert_eq!(LineTerminator::Cr.as_str(), "\r");
    }

    #[test]
    fn writing_after_close_fails() {
        let writer = LineItemWriterBuilder::new()
            .from_writer(Vec::new())
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let error = writer.write(&["late"]).unwrap_err();
        assert!(matches!(error, BatchError::ItemWriter(_)));
    }

    #[test]
    fn append_writes_bom_only_into_empty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.txt");

        for line in ["first", "second"] {
            let writer = LineItemWriterBuilder::new()
                .path(&path)
                .mode(WriteMode::Append)
                .encoding(Encoding::Utf8Bom)
                .terminator(LineTerminator::Lf)
                .build()
                .unwrap();
            writer.write(&[line]).unwrap();
            writer.close().unwrap();
        }

        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFfirst\nsecond\n");
    }

    #[test]
    fn overwrite_truncates_and_rewrites_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("over.txt");
        fs::write(&path, "old content that is longer\n").unwrap();

        let writer = LineItemWriterBuilder::new()
            .path(&path)
            .encoding(Encoding::Utf8Bom)
            .terminator(LineTerminator::Lf)
            .build()
            .unwrap();
        writer.write(&["new"]).unwrap();
        drop(writer);

        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFnew\n");
    }

    #[test]
    fn invalid_arguments_are_caught_before_opening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never.txt");

        let error = LineItemWriterBuilder::new().build().unwrap_err();
        assert!(matches!(
            error,
            BatchError::InvalidArgument(ArgumentError::Null("path"))
        ));

        let error = LineItemWriterBuilder::new()
            .path(&path)
            .encoding(None)
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            BatchError::InvalidArgument(ArgumentError::Null("encoding"))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn missing_parent_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_dir").join("out.txt");

        let error = LineItemWriterBuilder::new().path(&path).build().unwrap_err();
        assert!(matches!(error, BatchError::NotFound(p) if p == path));
    }

    #[test]
    fn writer_debug_shows_its_settings() {
        let writer = LineItemWriterBuilder::new()
            .encoding(Encoding::Utf16Be)
            .terminator(LineTerminator::CrLf)
            .from_writer(Vec::new())
            .unwrap();

        let debug = format!("{writer:?}");
        assert!(debug.contains("Utf16Be"));
        assert!(debug.contains("CrLf"));
    }
}
