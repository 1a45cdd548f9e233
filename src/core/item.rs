use crate::error::BatchError;

/// Result of a single [`ItemReader::read`] call.
///
/// - `Ok(Some(item))`: an item was read
/// - `Ok(None)`: the source is exhausted
/// - `Err(error)`: reading failed
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of an [`ItemWriter`] operation.
pub type ItemWriterResult = Result<(), BatchError>;

/// Retrieves input one item at a time.
///
/// Readers take `&self` and keep their cursor behind interior mutability, so a
/// reader can be shared by reference with the code driving it.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Writes output one chunk of items at a time.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
