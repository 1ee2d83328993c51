//! Name-addressed CSV rows.
//!
//! [`MapReader`] wraps a [`csv::Reader`], takes the first record of the input as the
//! header row and hands out every following record as a [`RowMap`], keyed by column
//! name instead of position. Callers that look fields up by name keep working when
//! the producer reorders columns.
//!
//! ## Quick start
//!
//! ```
//! use csvmap_reader::MapReader;
//!
//! let data = "first,second,third\na,b,c\n";
//! let mut reader = MapReader::new(data.as_bytes())?;
//!
//! assert_eq!(reader.headers().to_vec(), vec!["first", "second", "third"]);
//! assert_eq!(reader.header_index().get("third"), Some(2));
//!
//! let row = reader.read()?.expect("one data row");
//! assert_eq!(row["first"], "a");
//! assert_eq!(row["third"], "c");
//!
//! // End of data is not an error.
//! assert!(reader.read()?.is_none());
//! # Ok::<(), csvmap_reader::MapReaderError>(())
//! ```
//!
//! The input is any [`std::io::Read`]: files, sockets, in-memory buffers. Opening and
//! closing the underlying stream stays with the caller, see [`MapReader::into_inner`].

pub mod error;
pub mod header;
pub mod options;
pub mod reader;

pub use error::MapReaderError;
pub use header::{DuplicateHeaders, HeaderIndex, RowMap};
pub use options::MapReaderOptions;
pub use reader::{IntoMapRecords, MapReader, MapRecords};

pub type MapResult<T> = std::result::Result<T, error::MapReaderError>;
