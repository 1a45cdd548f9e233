mod common;

use std::io::{self, ErrorKind};

use batch_lines::{
    core::item::{ItemReader, ItemWriter},
    error::BatchError,
    item::text::{Encoding, LineItemReader, LineItemWriterBuilder, LineReaderBuilder, WriteMode},
};

use common::{init_logger, mocks::MockFile};

#[test]
fn failing_sink_surfaces_on_close() {
    init_logger();
    let mut file = MockFile::default();
    file.expect_write()
        .returning(|_| Err(io::Error::other("disk full")));
    file.expect_flush().returning(|| Ok(()));

    let writer = LineItemWriterBuilder::new().from_writer(file).unwrap();
    writer.write(&["buffered"]).unwrap();

    match writer.close() {
        Err(BatchError::Io(error)) => assert_eq!(error.to_string(), "disk full"),
        other => panic!("expected Io error, got {other:?}"),
    }
    assert!(!writer.is_open());
    assert!(writer.close().is_ok());
}

#[test]
fn failing_sink_rejects_the_bom() {
    let mut file = MockFile::default();
    file.expect_write()
        .returning(|_| Err(io::Error::new(ErrorKind::PermissionDenied, "read-only")));
    file.expect_flush().returning(|| Ok(()));

    let writer = LineItemWriterBuilder::new()
        .encoding(Encoding::Utf16Le)
        .from_writer(file)
        .unwrap();

    // the two BOM bytes fit in the buffer; the failure shows on flush
    let error = writer.flush().unwrap_err();
    assert!(matches!(error, BatchError::Io(e) if e.kind() == ErrorKind::PermissionDenied));
}

#[test]
fn append_to_a_stream_writes_no_bom() {
    let mut file = MockFile::default();
    file.expect_write().returning(|buf| {
        assert_ne!(&buf[..2], &[0xFF, 0xFE]);
        Ok(buf.len())
    });
    file.expect_flush().returning(|| Ok(()));

    let writer = LineItemWriterBuilder::new()
        .mode(WriteMode::Append)
        .encoding(Encoding::Utf16Le)
        .from_writer(file)
        .unwrap();
    writer.write(&["tail"]).unwrap();
    writer.close().unwrap();
}

#[test]
fn failing_source_closes_the_session() {
    init_logger();
    let mut file = MockFile::default();
    let mut calls = 0;
    file.expect_read().returning(move |buf| {
        calls += 1;
        if calls == 1 {
            buf[..5].copy_from_slice(b"ab\ncd");
            Ok(5)
        } else {
            Err(io::Error::other("device unplugged"))
        }
    });

    let reader = LineItemReader::from_reader(file);
    assert_eq!(reader.read().unwrap(), Some("ab".to_string()));
    assert!(reader.is_open());

    let error = reader.read().unwrap_err();
    assert!(matches!(error, BatchError::Io(_)));
    assert!(!reader.is_open());
    assert_eq!(reader.read_count(), 1);

    // a closed session is simply exhausted
    assert_eq!(reader.read().unwrap(), None);
}

#[test]
fn interrupted_reads_are_retried() {
    let mut file = MockFile::default();
    let mut calls = 0;
    file.expect_read().returning(move |buf| {
        calls += 1;
        match calls {
            1 => Err(io::Error::from(ErrorKind::Interrupted)),
            2 => {
                buf[..6].copy_from_slice(b"line\r\n");
                Ok(6)
            }
            _ => Ok(0),
        }
    });

    let reader = LineReaderBuilder::new().from_reader(file).unwrap();
    let lines: Vec<String> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(lines, vec!["line"]);
}
