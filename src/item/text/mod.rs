//! Line-oriented text file support.
//!
//! This module reads and writes text files as sequences of lines, with a
//! configurable encoding and write mode.
//!
//! # Module Architecture
//!
//! 1. **LineReader**: a stateless, restartable line source for one file. Each
//!    enumeration opens its own handle and decodes the file incrementally, so
//!    files are never loaded whole.
//!
//! 2. **LineItemReader**: one enumeration session. It owns the file handle and
//!    releases it when the lines run out, when a read fails, when it is closed,
//!    or when it is dropped, whichever comes first.
//!
//! 3. **LineItemWriter**: writes lines in `Overwrite` or `Append` mode with a
//!    configurable encoding and terminator.
//!
//! 4. **Bulk functions**: [`read_all_lines`], [`read_lines`] and
//!    [`write_all_lines`] wrap the above for whole-file use.
//!
//! Lines are split on `\n`, `\r\n` and lone `\r`. A terminator at the end of
//! the file does not produce a trailing empty line.
//!
//! # Examples
//!
//! ## Round trip
//!
//! ```
//! use batch_lines::item::text::{read_all_lines, write_all_lines, Encoding, WriteMode};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("round_trip.txt");
//!
//! let lines = vec![Some("first"), None, Some("third")];
//! write_all_lines(&path, &lines, WriteMode::Overwrite, Some(Encoding::Utf16Le)).unwrap();
//!
//! let read = read_all_lines(&path, None).unwrap();
//! assert_eq!(read, vec!["first", "", "third"]);
//! ```
//!
//! ## Streaming without loading the file
//!
//! ```
//! use batch_lines::item::text::{read_lines, write_all_lines, WriteMode};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("big.txt");
//! let numbers: Vec<String> = (0..1000).map(|n| n.to_string()).collect();
//! write_all_lines(&path, &numbers, WriteMode::Overwrite, None).unwrap();
//!
//! let reader = read_lines(&path, None).unwrap();
//!
//! // only the first lines are read; the handle is released
//! // as soon as the iterator is dropped
//! let head: Vec<String> = reader.lines().take(3).collect::<Result<_, _>>().unwrap();
//! assert_eq!(head, vec!["0", "1", "2"]);
//!
//! // each enumeration starts over from the beginning
//! assert_eq!(reader.lines().count(), 1000);
//! ```

/// Whole-file read and write functions.
pub mod bulk;

/// Text encodings, byte-order marks and incremental decoding.
pub mod encoding;

/// Lazily opened line sources and enumeration sessions.
pub mod line_reader;

/// Line boundary detection.
pub mod line_splitter;

/// Line writers, write modes and terminators.
pub mod line_writer;

pub use bulk::{
    append_all_lines, read_all_lines, read_all_lines_with, read_lines, read_lines_with,
    write_all_lines, write_all_lines_opt, write_all_lines_with, ReadOptions, WriteOptions,
};
pub use encoding::Encoding;
pub use line_reader::{LineItemReader, LineReader, LineReaderBuilder, Lines};
pub use line_writer::{AsLine, LineItemWriter, LineItemWriterBuilder, LineTerminator, WriteMode};
