use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs::File,
    io::{self, ErrorKind, Read},
    iter::FusedIterator,
    path::{Path, PathBuf},
};

use log::{debug, error};
use uuid::Uuid;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::{check_path, ArgumentError, BatchError},
};

use super::{
    encoding::{detect_bom_for, Decoder, Encoding, BOM_PROBE_LEN},
    line_splitter::LineSplitter,
};

/// Default size of the byte buffer each session reads into.
pub const DEFAULT_CAPACITY: usize = 4096;

const MIN_CAPACITY: usize = BOM_PROBE_LEN;

/// A builder for [`LineReader`]s and in-memory [`LineItemReader`]s.
///
/// # Default Configuration
///
/// - Encoding: UTF-8
/// - BOM detection: enabled (a detected BOM overrides the configured encoding,
///   except for Latin-1 which has none)
/// - Buffer capacity: 4096 bytes
///
/// # Examples
///
/// ```
/// use batch_lines::item::text::{encoding::Encoding, line_reader::LineReaderBuilder};
///
/// let reader = LineReaderBuilder::new()
///     .path("data/input.txt")
///     .encoding(Encoding::Latin1)
///     .capacity(8192)
///     .build()
///     .unwrap();
///
/// assert_eq!(reader.encoding(), Encoding::Latin1);
/// ```
#[derive(Debug)]
pub struct LineReaderBuilder {
    path: Option<PathBuf>,
    // `Some(None)` records an encoding that was explicitly cleared
    encoding: Option<Option<Encoding>>,
    detect_bom: bool,
    capacity: usize,
}

impl Default for LineReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReaderBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            encoding: None,
            detect_bom: true,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets the file to read.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the encoding used when the file carries no BOM.
    ///
    /// Passing `None` clears the encoding, which makes [`build`](Self::build)
    /// fail. Leave this unset to get UTF-8.
    pub fn encoding<E: Into<Option<Encoding>>>(mut self, encoding: E) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Enables or disables byte-order mark detection.
    ///
    /// A detected mark replaces the configured encoding. Latin-1 never looks
    /// for one, and a UTF-16LE reader takes `FF FE 00 00` as its own mark
    /// followed by U+0000 rather than as a UTF-32LE mark.
    pub fn detect_bom(mut self, yes: bool) -> Self {
        self.detect_bom = yes;
        self
    }

    /// Sets the read buffer size in bytes. Values below 4 are raised to 4.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(MIN_CAPACITY);
        self
    }

    fn resolve_encoding(&self) -> Result<Encoding, BatchError> {
        match self.encoding {
            None => Ok(Encoding::default()),
            Some(Some(encoding)) => Ok(encoding),
            Some(None) => Err(ArgumentError::Null("encoding").into()),
        }
    }

    /// Validates the configuration and creates the reader.
    ///
    /// No file is opened here; each call to [`LineReader::open`] or
    /// [`LineReader::lines`] opens its own handle.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(Null("path"))` if no path was set
    /// - `InvalidArgument(Empty("path"))` if the path is empty
    /// - `InvalidArgument(Null("encoding"))` if the encoding was cleared
    pub fn build(self) -> Result<LineReader, BatchError> {
        let path = self.path.clone().ok_or(ArgumentError::Null("path"))?;
        check_path(&path)?;
        let encoding = self.resolve_encoding()?;

        Ok(LineReader {
            id: Uuid::new_v4(),
            path,
            options: SessionOptions {
                encoding,
                detect_bom: self.detect_bom,
                capacity: self.capacity,
            },
        })
    }

    /// Creates a session over any `Read` source instead of a file.
    ///
    /// # Examples
    ///
    /// ```
    /// use batch_lines::core::item::ItemReader;
    /// use batch_lines::item::text::line_reader::LineReaderBuilder;
    ///
    /// let reader = LineReaderBuilder::new()
    ///     .from_reader("first\r\nsecond".as_bytes())
    ///     .unwrap();
    ///
    /// assert_eq!(reader.read().unwrap(), Some("first".to_string()));
    /// assert_eq!(reader.read().unwrap(), Some("second".to_string()));
    /// assert_eq!(reader.read().unwrap(), None);
    /// assert!(!reader.is_open());
    /// ```
    pub fn from_reader<R: Read>(self, source: R) -> Result<LineItemReader<R>, BatchError> {
        let encoding = self.resolve_encoding()?;
        let options = SessionOptions {
            encoding,
            detect_bom: self.detect_bom,
            capacity: self.capacity,
        };
        Ok(LineItemReader::new(source, &options, None, None))
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionOptions {
    encoding: Encoding,
    detect_bom: bool,
    capacity: usize,
}

/// A restartable source of lines backed by a file.
///
/// The reader itself holds no handle and no cursor. Every call to
/// [`open`](Self::open) or [`lines`](Self::lines) starts an independent
/// session that reads the file from the beginning as it is on disk at that
/// moment.
///
/// # Examples
///
/// ```
/// use batch_lines::item::text::line_reader::LineReaderBuilder;
/// use std::io::Write;
///
/// let mut file = tempfile::NamedTempFile::new().unwrap();
/// write!(file, "alpha\nbeta\n").unwrap();
///
/// let reader = LineReaderBuilder::new().path(file.path()).build().unwrap();
///
/// let first: Vec<String> = reader.lines().collect::<Result<_, _>>().unwrap();
/// let again: Vec<String> = reader.lines().collect::<Result<_, _>>().unwrap();
/// assert_eq!(first, vec!["alpha", "beta"]);
/// assert_eq!(first, again);
/// ```
#[derive(Debug)]
pub struct LineReader {
    id: Uuid,
    path: PathBuf,
    options: SessionOptions,
}

impl LineReader {
    /// Identifier shared by every session this reader starts.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Encoding {
        self.options.encoding
    }

    /// Opens the file and starts a new session.
    ///
    /// The file is opened read-only without requesting exclusive access.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `AccessDenied` if permissions forbid reading it
    /// - `IoBusy` if another handle holds an incompatible lock (Windows only)
    pub fn open(&self) -> Result<LineItemReader<File>, BatchError> {
        let file = File::open(&self.path).map_err(|e| {
            error!("Failed to open line file {}: {}", self.path.display(), e);
            BatchError::from_io(e, &self.path)
        })?;

        let session = LineItemReader::new(
            file,
            &self.options,
            Some(self.path.clone()),
            Some(self.id),
        );
        debug!(
            "Opened line session {} on {}",
            session.id(),
            self.path.display()
        );
        Ok(session)
    }

    /// Returns a lazy iterator over the file's lines.
    ///
    /// Nothing is opened until the first call to `next`; an open failure is
    /// returned as the first item.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            reader: self,
            state: LinesState::Pending,
        }
    }
}

impl<'a> IntoIterator for &'a LineReader {
    type Item = Result<String, BatchError>;
    type IntoIter = Lines<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}

/// Decode state of an open session.
#[derive(Debug)]
struct Session<R> {
    source: R,
    buffer: Vec<u8>,
    // leading bytes held back until the BOM question is settled
    head: Option<Vec<u8>>,
    decoder: Decoder,
    splitter: LineSplitter,
    text: String,
    ready: VecDeque<String>,
    exhausted: bool,
}

impl<R: Read> Session<R> {
    fn new(source: R, options: &SessionOptions) -> Self {
        Self {
            source,
            buffer: vec![0; options.capacity],
            head: options.detect_bom.then(Vec::new),
            decoder: Decoder::new(options.encoding),
            splitter: LineSplitter::new(),
            text: String::new(),
            ready: VecDeque::new(),
            exhausted: false,
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.exhausted {
                return Ok(self.splitter.finish());
            }
            self.fill()?;
        }
    }

    /// Reads one buffer and splits whatever text it completes.
    fn fill(&mut self) -> io::Result<()> {
        let count = loop {
            match self.source.read(&mut self.buffer) {
                Ok(count) => break count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        let last = count == 0;
        self.exhausted = last;

        if let Some(mut head) = self.head.take() {
            head.extend_from_slice(&self.buffer[..count]);
            if head.len() < BOM_PROBE_LEN && !last {
                self.head = Some(head);
                return Ok(());
            }

            let offset = match detect_bom_for(&head, self.decoder.encoding()) {
                Some(bom) => {
                    self.decoder = Decoder::new(bom.encoding);
                    bom.bom_length
                }
                None => 0,
            };
            self.decoder.decode(&head[offset..], &mut self.text, last);
        } else {
            self.decoder
                .decode(&self.buffer[..count], &mut self.text, last);
        }

        self.splitter.feed(&self.text, &mut self.ready);
        self.text.clear();
        Ok(())
    }
}

/// An enumeration session over a stream of lines.
///
/// The session owns its source (for file sessions, the open handle). The
/// source is released exactly once, as soon as one of these happens:
///
/// - the last line has been read
/// - a read fails
/// - [`close`](Self::close) is called
/// - the session is dropped
///
/// After that, [`read`](ItemReader::read) keeps returning `Ok(None)`.
#[derive(Debug)]
pub struct LineItemReader<R> {
    id: Uuid,
    reader_id: Option<Uuid>,
    path: Option<PathBuf>,
    state: RefCell<Option<Session<R>>>,
    read_count: Cell<usize>,
}

impl<R: Read> LineItemReader<R> {
    fn new(
        source: R,
        options: &SessionOptions,
        path: Option<PathBuf>,
        reader_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            path,
            state: RefCell::new(Some(Session::new(source, options))),
            read_count: Cell::new(0),
        }
    }

    /// Creates a UTF-8 session with BOM detection over `source`.
    pub fn from_reader(source: R) -> Self {
        let options = SessionOptions {
            encoding: Encoding::default(),
            detect_bom: true,
            capacity: DEFAULT_CAPACITY,
        };
        Self::new(source, &options, None, None)
    }

    fn io_error(&self, error: io::Error) -> BatchError {
        match &self.path {
            Some(path) => BatchError::from_io(error, path),
            None => BatchError::Io(error),
        }
    }
}

impl<R> LineItemReader<R> {
    /// Identifier of this session, unique per session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identifier of the [`LineReader`] that started this session, if any.
    pub fn reader_id(&self) -> Option<Uuid> {
        self.reader_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the session still holds its source.
    pub fn is_open(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Number of lines returned so far.
    pub fn read_count(&self) -> usize {
        self.read_count.get()
    }

    /// Releases the source. Calling it again does nothing.
    pub fn close(&self) {
        if self.state.borrow_mut().take().is_some() {
            debug!(
                "Closed line session {} after {} line(s)",
                self.id,
                self.read_count.get()
            );
        }
    }
}

impl<R: Read> ItemReader<String> for LineItemReader<R> {
    /// Reads the next line.
    ///
    /// # Returns
    /// - `Ok(Some(line))` for each line, without its terminator
    /// - `Ok(None)` once the stream is exhausted or the session is closed
    /// - `Err(error)` if reading fails; the session is closed first
    fn read(&self) -> ItemReaderResult<String> {
        let mut state = self.state.borrow_mut();
        let Some(session) = state.as_mut() else {
            return Ok(None);
        };

        match session.next_line() {
            Ok(Some(line)) => {
                self.read_count.set(self.read_count.get() + 1);
                Ok(Some(line))
            }
            Ok(None) => {
                drop(state);
                self.close();
                Ok(None)
            }
            Err(error) => {
                drop(state);
                self.close();
                Err(self.io_error(error))
            }
        }
    }
}

impl<R: Read> Iterator for LineItemReader<R> {
    type Item = Result<String, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

impl<R: Read> FusedIterator for LineItemReader<R> {}

impl<R> Drop for LineItemReader<R> {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug)]
enum LinesState {
    Pending,
    Open(LineItemReader<File>),
    Done,
}

/// Lazy line iterator returned by [`LineReader::lines`].
///
/// Opens its own session on the first call to `next` and drops it as soon as
/// the lines run out, an error is returned, or the iterator itself is dropped.
#[derive(Debug)]
pub struct Lines<'a> {
    reader: &'a LineReader,
    state: LinesState,
}

impl<'a> Lines<'a> {
    /// The reader this iterator was created from.
    pub fn reader(&self) -> &'a LineReader {
        self.reader
    }

    /// The underlying session, once it has been opened and while it is live.
    pub fn session(&self) -> Option<&LineItemReader<File>> {
        match &self.state {
            LinesState::Open(session) => Some(session),
            _ => None,
        }
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.session().is_some_and(LineItemReader::is_open)
    }

    /// Stops the enumeration and releases the handle, if any.
    pub fn close(&mut self) {
        self.state = LinesState::Done;
    }
}

impl Iterator for Lines<'_> {
    type Item = Result<String, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let LinesState::Pending = self.state {
            match self.reader.open() {
                Ok(session) => self.state = LinesState::Open(session),
                Err(error) => {
                    self.state = LinesState::Done;
                    return Some(Err(error));
                }
            }
        }

        let LinesState::Open(session) = &mut self.state else {
            return None;
        };
        let item = session.next();
        if !matches!(item, Some(Ok(_))) {
            self.state = LinesState::Done;
        }
        item
    }
}

impl FusedIterator for Lines<'_> {}
