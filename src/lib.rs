#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 <div align="center">
   <h1>Batch Lines</h1>
   <h3>📄 Line-oriented text file readers and writers for batch jobs</h3>
 </div>

 # Batch Lines

 **Batch Lines** reads and writes text files as sequences of lines. Files can be read
 whole or streamed lazily, one line at a time, without loading them into memory. Every
 file handle is released deterministically, whether the lines are read to the end,
 read partially and dropped, or abandoned because of an error.

 ## Core Concepts

- **ItemReader:** retrieves input one item at a time. A `LineItemReader` is an
  `ItemReader<String>` over one open file.
- **ItemWriter:** writes output one chunk of items at a time. A `LineItemWriter` writes
  each item as one line.
- **LineReader:** a restartable line source. It holds no handle; each enumeration opens
  the file again and sees its current content.
- **WriteMode:** `Overwrite` truncates the target, `Append` keeps what is already there.
- **Encoding:** UTF-8 (with or without BOM), UTF-16 LE/BE, UTF-32 LE/BE and Latin-1. A
  byte-order mark found on read selects the encoding automatically.

 ## Getting Started

```rust
use batch_lines::{
    error::BatchError,
    item::text::{read_all_lines, read_lines, write_all_lines, WriteMode},
};

fn main() -> Result<(), BatchError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cars.txt");

    write_all_lines(&path, &["Porsche 356", "Peugeot 205"], WriteMode::Overwrite, None)?;
    write_all_lines(&path, &["Mazda CX-30"], WriteMode::Append, None)?;

    assert_eq!(
        read_all_lines(&path, None)?,
        vec!["Porsche 356", "Peugeot 205", "Mazda CX-30"]
    );

    let reader = read_lines(&path, None)?;
    for line in &reader {
        let line = line?;
        assert!(!line.is_empty());
    }

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers / writers (line files)
pub mod item;
